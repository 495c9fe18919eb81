use crate::config::TunnelConfig;
use crate::error::{Error, Result};
use crossterm::event::KeyCode;
use image::Rgba;

/// Shared color scheme state
#[derive(Clone, Copy)]
pub struct ColorState {
    pub scheme: u8,
}

impl ColorState {
    pub fn new(default_scheme: u8) -> Self {
        Self { scheme: default_scheme.min(9) }
    }

    /// Handle color scheme key input. Returns true if key was handled.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('!') => self.scheme = 1,  // Shift+1: fire
            KeyCode::Char('@') => self.scheme = 2,  // Shift+2: ice
            KeyCode::Char('#') => self.scheme = 3,  // Shift+3: pink
            KeyCode::Char('$') => self.scheme = 4,  // Shift+4: gold
            KeyCode::Char('%') => self.scheme = 5,  // Shift+5: electric
            KeyCode::Char('^') => self.scheme = 6,  // Shift+6: lava
            KeyCode::Char('&') => self.scheme = 7,  // Shift+7: mono
            KeyCode::Char('*') => self.scheme = 8,  // Shift+8: moss
            KeyCode::Char('(') => self.scheme = 9,  // Shift+9: neon
            KeyCode::Char(')') => self.scheme = 0,  // Shift+0: configured colors
            _ => return false,
        }
        true
    }
}

/// Stroke color for discs and lines, plus the particle tint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub stroke: Rgba<u8>,
    pub particle_rgb: [u8; 3],
}

impl Palette {
    pub fn from_config(config: &TunnelConfig) -> Self {
        Self {
            stroke: config.stroke_color,
            particle_rgb: config.particle_rgb,
        }
    }
}

/// Palette for a scheme; scheme 0 keeps whatever the config asked for
pub fn scheme_palette(scheme: u8, config: &TunnelConfig) -> Palette {
    let (stroke, particle_rgb) = match scheme {
        1 => ([0x5a, 0x22, 0x0e], [255, 196, 80]),   // fire
        2 => ([0x1c, 0x3a, 0x5c], [180, 230, 255]),  // ice
        3 => ([0x52, 0x1c, 0x46], [255, 150, 220]),  // pink
        4 => ([0x55, 0x46, 0x12], [255, 225, 120]),  // gold
        5 => ([0x10, 0x48, 0x50], [120, 250, 255]),  // electric
        6 => ([0x5c, 0x14, 0x24], [255, 110, 90]),   // lava
        7 => ([0x80, 0x80, 0x80], [255, 255, 255]),  // mono
        8 => ([0x1e, 0x48, 0x22], [170, 255, 160]),  // moss
        9 => ([0x36, 0x1c, 0x5e], [225, 120, 255]),  // neon
        _ => return Palette::from_config(config),
    };
    Palette {
        stroke: Rgba([stroke[0], stroke[1], stroke[2], 0xff]),
        particle_rgb,
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional)
pub fn parse_hex_color(s: &str) -> Result<Rgba<u8>> {
    let invalid = || Error::InvalidColor(s.to_string());
    let hex = s.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut out = [0xff; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                out[i] = v * 17;
            }
            Ok(Rgba(out))
        }
        6 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, 0xff])),
        8 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => Err(invalid()),
    }
}
