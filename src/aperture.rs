//! The tunnel mouth: the disc where the stack stops sinking, and the region it bounds

use crate::disc::{Disc, DiscStack};
use serde::Serialize;

/// Axis-aligned rectangle, inclusive on every edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

/// Union of the mouth ellipse and the column rising from it to the top of the viewport
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MouthRegion {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
    pub column: Rect,
}

impl MouthRegion {
    pub fn around(disc: &Disc) -> Self {
        Self {
            cx: disc.x,
            cy: disc.y,
            rx: disc.w,
            ry: disc.h,
            column: Rect {
                x: disc.x - disc.w,
                y: 0.0,
                w: disc.w * 2.0,
                h: disc.y,
            },
        }
    }

    /// Inside or on the boundary of either shape
    pub fn contains(&self, px: f32, py: f32) -> bool {
        self.ellipse_contains(px, py) || self.column.contains(px, py)
    }

    fn ellipse_contains(&self, px: f32, py: f32) -> bool {
        let dx = px - self.cx;
        let dy = py - self.cy;
        if self.rx <= 0.0 || self.ry <= 0.0 {
            // Collapsed ellipse: a segment or a point
            return dx.abs() <= self.rx.max(0.0) && dy.abs() <= self.ry.max(0.0);
        }
        let nx = dx / self.rx;
        let ny = dy / self.ry;
        nx * nx + ny * ny <= 1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Aperture {
    pub index: usize,
    pub disc: Disc,
    pub region: MouthRegion,
}

impl Aperture {
    /// Walk the stack near to far and keep the last disc whose bottom edge did not
    /// drop below the previous one. `viewport_height` seeds the comparison.
    ///
    /// Falls back to the first disc when nothing qualifies.
    pub fn detect(stack: &DiscStack, viewport_height: f32) -> Self {
        let mut selected: Option<(usize, Disc)> = None;
        let mut prev_bottom = viewport_height;

        for (i, disc) in stack.discs.iter().enumerate() {
            let bottom = disc.bottom();
            if bottom <= prev_bottom {
                selected = Some((i, *disc));
            }
            prev_bottom = bottom;
        }

        let (index, disc) = selected
            .or_else(|| stack.discs.first().map(|d| (0, *d)))
            .unwrap_or_default();

        Self {
            index,
            disc,
            region: MouthRegion::around(&disc),
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        self.region.contains(px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TunnelConfig;
    use crate::disc::DiscShape;

    fn stack(width: f32, height: f32) -> DiscStack {
        let config = TunnelConfig::default();
        DiscStack::build(
            DiscShape::from_proportions(&config.start, width, height),
            DiscShape::from_proportions(&config.end, width, height),
            config.total_discs,
        )
    }

    #[test]
    fn default_800x600_selects_disc_77() {
        let discs = stack(800.0, 600.0);
        let aperture = Aperture::detect(&discs, 600.0);
        assert_eq!(aperture.index, 77);
        assert_eq!(aperture.disc, discs.discs[77]);
    }

    #[test]
    fn detection_is_deterministic() {
        let discs = stack(1280.0, 720.0);
        let first = Aperture::detect(&discs, 720.0);
        for _ in 0..5 {
            assert_eq!(Aperture::detect(&discs, 720.0), first);
        }
    }

    #[test]
    fn selected_index_ends_the_sinking_run() {
        let discs = stack(800.0, 600.0);
        let aperture = Aperture::detect(&discs, 600.0);
        let bottoms: Vec<f32> = discs.discs.iter().map(|d| d.bottom()).collect();
        let i = aperture.index;

        // every step from disc 1 up to the mouth moves the bottom edge up (or keeps it)
        for k in 1..=i {
            assert!(bottoms[k] <= bottoms[k - 1]);
        }
        // and every later disc pushes it back down
        for k in i + 1..bottoms.len() {
            assert!(bottoms[k] > bottoms[k - 1]);
        }
    }

    #[test]
    fn scales_with_viewport() {
        let small = Aperture::detect(&stack(800.0, 600.0), 600.0);
        let large = Aperture::detect(&stack(1600.0, 1200.0), 1200.0);
        assert_eq!(small.index, large.index);
        assert!((large.disc.w - small.disc.w * 2.0).abs() < 1e-2);
        assert!((large.disc.y - small.disc.y * 2.0).abs() < 1e-2);
    }

    #[test]
    fn region_includes_ellipse_column_and_boundary() {
        let disc = Disc { x: 100.0, y: 50.0, w: 20.0, h: 10.0, progress: 0.5 };
        let region = MouthRegion::around(&disc);

        assert!(region.contains(100.0, 50.0));
        // ellipse boundary, below the column
        assert!(region.contains(100.0, 60.0));
        assert!(region.contains(120.0, 50.0));
        // column up to the top edge
        assert!(region.contains(85.0, 0.0));
        assert!(region.contains(80.0, 25.0));
        // outside
        assert!(!region.contains(100.0, 60.5));
        assert!(!region.contains(121.0, 20.0));
        assert!(!region.contains(119.0, 59.0));
    }

    #[test]
    fn empty_stack_falls_back_to_zero_disc() {
        let empty = DiscStack {
            start: DiscShape::default(),
            end: DiscShape::default(),
            discs: Vec::new(),
        };
        let aperture = Aperture::detect(&empty, 0.0);
        assert_eq!(aperture.index, 0);
        assert!(aperture.contains(0.0, 0.0));
        assert!(!aperture.contains(1.0, 0.0));
    }
}
