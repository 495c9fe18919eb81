use crate::canvas::Canvas;
use crate::terminal::{rgb, Terminal};
use crate::tunnel::Viewport;
use image::{imageops, Rgba, RgbaImage};

/// Logical units per half-block pixel. Keeps motion speed independent of supersampling.
pub const UNITS_PER_PIXEL: f32 = 4.0;

/// The tunnel's view of a terminal: a logical viewport plus the raster it draws into
pub struct Surface {
    pub cols: u16,
    pub rows: u16,
    pub viewport: Viewport,
    pub canvas: Option<Canvas>,
}

impl Surface {
    /// Each cell is one pixel wide and two tall; `supersample` raster pixels per pixel
    pub fn new(cols: u16, rows: u16, supersample: u32) -> Self {
        let supersample = supersample.max(1) as f32;
        let viewport = Viewport::new(
            cols as f32 * UNITS_PER_PIXEL,
            rows as f32 * 2.0 * UNITS_PER_PIXEL,
            supersample / UNITS_PER_PIXEL,
        );
        Self {
            cols,
            rows,
            viewport,
            canvas: viewport.canvas(),
        }
    }

    /// Raster reduced to one pixel per half block, over `background`
    pub fn downsample(&self, background: Rgba<u8>) -> Option<RgbaImage> {
        let canvas = self.canvas.as_ref()?;
        let (w, h) = (self.cols as u32, self.rows as u32 * 2);
        if w == 0 || h == 0 {
            return None;
        }
        let flat = canvas.flatten(background);
        if flat.width() == w && flat.height() == h {
            return Some(flat);
        }
        Some(imageops::resize(&flat, w, h, imageops::FilterType::Triangle))
    }
}

/// Paint an image of `cols × rows*2` pixels using upper-half blocks:
/// foreground is the top pixel, background the bottom one.
pub fn render_halfblock(term: &mut Terminal, pixels: &RgbaImage) {
    let rows = pixels.height() / 2;
    for cy in 0..rows {
        for cx in 0..pixels.width() {
            let top = pixels.get_pixel(cx, cy * 2).0;
            let bot = pixels.get_pixel(cx, cy * 2 + 1).0;
            term.set_with_bg(
                cx as i32,
                cy as i32,
                '▀',
                Some(rgb(top[0], top[1], top[2])),
                Some(rgb(bot[0], bot[1], bot[2])),
            );
        }
    }
}
