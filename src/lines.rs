//! Radial line grid warped across the disc stack.
//!
//! Lines are rendered once into their own canvas. Each line is drawn freely until
//! one of its points lands in the tunnel mouth; from there on every segment is
//! clipped to the mouth, so the grid appears to be swallowed by the tunnel.

use crate::aperture::MouthRegion;
use crate::canvas::Canvas;
use crate::disc::DiscStack;
use image::Rgba;
use std::f32::consts::TAU;

pub type Point = (f32, f32);

#[derive(Clone, Debug, Default)]
pub struct LineGrid {
    pub lines: Vec<Vec<Point>>,
}

impl LineGrid {
    /// One line per angle, one point per disc
    pub fn build(stack: &DiscStack, total_lines: usize) -> Self {
        let mut lines: Vec<Vec<Point>> = (0..total_lines)
            .map(|_| Vec::with_capacity(stack.len()))
            .collect();
        let step = TAU / total_lines.max(1) as f32;

        for disc in &stack.discs {
            for (i, line) in lines.iter_mut().enumerate() {
                let angle = i as f32 * step;
                line.push((disc.x + angle.cos() * disc.w, disc.y + angle.sin() * disc.h));
            }
        }

        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self, canvas: &mut Canvas, mouth: &MouthRegion, width: f32, color: Rgba<u8>) {
        for line in &self.lines {
            render_line(canvas, line, mouth, width, color);
        }
        canvas.reset_clip();
    }
}

/// Stroke one line, clipped from the first segment that ends inside the mouth.
/// Returns the index of that segment, or `None` when the line never reached the mouth.
pub fn render_line(
    canvas: &mut Canvas,
    line: &[Point],
    mouth: &MouthRegion,
    width: f32,
    color: Rgba<u8>,
) -> Option<usize> {
    canvas.reset_clip();
    let entered = line
        .windows(2)
        .position(|pair| mouth.contains(pair[1].0, pair[1].1));

    // unclipped run, then the clipped run from the entering segment on
    match entered {
        Some(j) => {
            canvas.stroke_polyline(&line[..=j], width, color);
            canvas.clip(*mouth);
            canvas.stroke_polyline(&line[j..], width, color);
        }
        None => canvas.stroke_polyline(line, width, color),
    }

    canvas.reset_clip();
    entered
}

/// Cache identity: the layer is valid only for this raster and stack revision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerKey {
    pub width: u32,
    pub height: u32,
    pub scale_bits: u32,
    pub revision: u64,
}

/// Pre-rendered line grid reused every frame
pub struct LineLayer {
    pub key: LayerKey,
    pub canvas: Canvas,
}

impl LineLayer {
    /// Render the grid into a fresh canvas, or `None` for an empty viewport
    pub fn render(
        grid: &LineGrid,
        mouth: &MouthRegion,
        viewport: (f32, f32),
        scale: f32,
        revision: u64,
        width: f32,
        color: Rgba<u8>,
    ) -> Option<Self> {
        let mut canvas = Canvas::for_viewport(viewport.0, viewport.1, scale)?;
        grid.render(&mut canvas, mouth, width, color);
        let key = LayerKey {
            width: canvas.width(),
            height: canvas.height(),
            scale_bits: scale.to_bits(),
            revision,
        };
        Some(Self { key, canvas })
    }

    pub fn matches(&self, key: &LayerKey) -> bool {
        self.key == *key
    }
}
