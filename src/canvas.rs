//! Software raster surface the tunnel draws onto.
//!
//! Coordinates passed in are logical units; the canvas multiplies them by its
//! pixel scale. A clip region, when set, is tested in logical units at each
//! pixel center. Edges are anti-aliased by coverage.

use crate::aperture::MouthRegion;
use image::{imageops, Pixel, Rgba, RgbaImage};
use std::f32::consts::TAU;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Largest raster we allocate (8192 x 8192)
pub const MAX_PIXELS: u64 = 8192 * 8192;

// Ellipse flattening: segment count grows with radius, within these bounds
const MIN_ELLIPSE_SEGMENTS: usize = 24;
const MAX_ELLIPSE_SEGMENTS: usize = 256;

pub struct Canvas {
    image: RgbaImage,
    scale: f32,
    clip: Option<MouthRegion>,
}

impl Canvas {
    /// Raster surface for a logical viewport. `None` when the viewport has no area
    /// or would exceed `MAX_PIXELS`.
    pub fn for_viewport(width: f32, height: f32, scale: f32) -> Option<Self> {
        let (px_w, px_h) = Self::raster_size(width, height, scale)?;
        Some(Self {
            image: RgbaImage::from_pixel(px_w, px_h, TRANSPARENT),
            scale,
            clip: None,
        })
    }

    /// Pixel dimensions for a logical viewport, if it is drawable
    pub fn raster_size(width: f32, height: f32, scale: f32) -> Option<(u32, u32)> {
        if !(width > 0.0 && height > 0.0 && scale > 0.0) {
            return None;
        }
        let px_w = (width * scale).ceil();
        let px_h = (height * scale).ceil();
        if !(px_w >= 1.0 && px_h >= 1.0) || px_w as f64 * px_h as f64 > MAX_PIXELS as f64 {
            return None;
        }
        Some((px_w as u32, px_h as u32))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn clear(&mut self) {
        for px in self.image.pixels_mut() {
            *px = TRANSPARENT;
        }
    }

    /// Restrict subsequent drawing to `region`
    pub fn clip(&mut self, region: MouthRegion) {
        self.clip = Some(region);
    }

    pub fn reset_clip(&mut self) {
        self.clip = None;
    }

    pub fn is_clipped(&self) -> bool {
        self.clip.is_some()
    }

    /// Blend `color` into one raster pixel, honoring the clip
    fn plot(&mut self, px: u32, py: u32, color: Rgba<u8>, coverage: f32) {
        if coverage <= 0.0 {
            return;
        }
        if let Some(region) = &self.clip {
            let lx = (px as f32 + 0.5) / self.scale;
            let ly = (py as f32 + 0.5) / self.scale;
            if !region.contains(lx, ly) {
                return;
            }
        }
        let mut src = color;
        src.0[3] = (color.0[3] as f32 * coverage.min(1.0)).round() as u8;
        if src.0[3] == 0 {
            return;
        }
        self.image.get_pixel_mut(px, py).blend(&src);
    }

    /// Pixel index range covering `[lo, hi]` in raster units, clamped to `limit`
    fn span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
        let start = lo.floor().max(0.0) as u32;
        let end = (hi.ceil().max(0.0) as u32).min(limit);
        start.min(end)..end
    }

    pub fn stroke_segment(&mut self, p0: (f32, f32), p1: (f32, f32), width: f32, color: Rgba<u8>) {
        self.stroke_polyline(&[p0, p1], width, color);
    }

    /// Stroke connected segments. Each pixel takes its coverage from the nearest
    /// segment and is blended once.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgba<u8>) {
        if points.len() < 2 {
            return;
        }
        let s = self.scale;
        let raster: Vec<(f32, f32)> = points.iter().map(|&(x, y)| (x * s, y * s)).collect();
        if raster.iter().any(|(x, y)| !(x.is_finite() && y.is_finite())) {
            return;
        }
        let half = (width * s / 2.0).max(0.0);
        let reach = half + 1.0;

        let (min_x, max_x, min_y, max_y) = raster.iter().fold(
            (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
            |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
        );
        let xs = Self::span(min_x - reach, max_x + reach, self.width());
        let ys = Self::span(min_y - reach, max_y + reach, self.height());
        let cols = (xs.end - xs.start) as usize;
        let rows = (ys.end - ys.start) as usize;
        if cols == 0 || rows == 0 {
            return;
        }

        let mut coverage = vec![0.0f32; cols * rows];
        for pair in raster.windows(2) {
            let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
            let (dx, dy) = (bx - ax, by - ay);
            let len_sq = dx * dx + dy * dy;

            let seg_xs = Self::span(ax.min(bx) - reach, ax.max(bx) + reach, xs.end);
            let seg_ys = Self::span(ay.min(by) - reach, ay.max(by) + reach, ys.end);
            for py in seg_ys.start.max(ys.start)..seg_ys.end {
                for px in seg_xs.start.max(xs.start)..seg_xs.end {
                    let cx = px as f32 + 0.5;
                    let cy = py as f32 + 0.5;
                    let t = if len_sq > 0.0 {
                        (((cx - ax) * dx + (cy - ay) * dy) / len_sq).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let (qx, qy) = (ax + dx * t - cx, ay + dy * t - cy);
                    let dist = (qx * qx + qy * qy).sqrt();
                    let cell = &mut coverage[(py - ys.start) as usize * cols + (px - xs.start) as usize];
                    *cell = cell.max(half + 0.5 - dist);
                }
            }
        }

        for (i, &cover) in coverage.iter().enumerate() {
            let px = xs.start + (i % cols) as u32;
            let py = ys.start + (i / cols) as u32;
            self.plot(px, py, color, cover);
        }
    }

    pub fn stroke_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, width: f32, color: Rgba<u8>) {
        let radius_px = rx.abs().max(ry.abs()) * self.scale;
        let segments = ((radius_px * 0.75) as usize).clamp(MIN_ELLIPSE_SEGMENTS, MAX_ELLIPSE_SEGMENTS);
        let points: Vec<(f32, f32)> = (0..=segments)
            .map(|i| {
                let a = TAU * i as f32 / segments as f32;
                (cx + a.cos() * rx, cy + a.sin() * ry)
            })
            .collect();
        self.stroke_polyline(&points, width, color);
    }

    /// Fill an axis-aligned rectangle with box-filtered edges
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        let s = self.scale;
        let (x0, y0) = (x * s, y * s);
        let (x1, y1) = ((x + w) * s, (y + h) * s);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return;
        }
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));

        for py in Self::span(y0, y1, self.height()) {
            let cover_y = (y1.min(py as f32 + 1.0) - y0.max(py as f32)).max(0.0);
            for px in Self::span(x0, x1, self.width()) {
                let cover_x = (x1.min(px as f32 + 1.0) - x0.max(px as f32)).max(0.0);
                self.plot(px, py, color, cover_x * cover_y);
            }
        }
    }

    /// Source-over composite of another canvas of the same raster size
    pub fn draw_canvas(&mut self, layer: &Canvas) {
        imageops::overlay(&mut self.image, &layer.image, 0, 0);
    }

    /// Copy of the raster composited over an opaque background
    pub fn flatten(&self, background: Rgba<u8>) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(self.width(), self.height(), background);
        imageops::overlay(&mut out, &self.image, 0, 0);
        out
    }
}
