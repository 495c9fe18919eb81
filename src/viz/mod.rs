//! Terminal host for the tunnel
//!
//! `tunnel::run` drives the animation live; `halfblock` turns the raster into
//! terminal cells.

pub mod halfblock;
pub mod tunnel;

use crate::colors::ColorState;
use crossterm::event::{KeyCode, KeyModifiers};

/// Runtime state for interactive controls
pub struct VizState {
    pub speed: f32,        // Current speed (time per frame)
    pub colors: ColorState,
    pub paused: bool,
    pub show_info: bool,
}

impl VizState {
    pub fn new(initial_speed: f32, scheme: u8) -> Self {
        Self {
            speed: initial_speed,
            colors: ColorState::new(scheme),
            paused: false,
            show_info: false,
        }
    }

    pub fn color_scheme(&self) -> u8 {
        self.colors.scheme
    }

    /// Handle keypress, returns true if should quit
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('i') => self.show_info = !self.show_info,
            // Number keys: frame time (1=fastest, 9=slowest, 0=very slow)
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.speed = match c {
                    '1' => 0.008,
                    '2' => 0.012,
                    '3' => 0.016,
                    '4' => 0.02,
                    '5' => 0.03,
                    '6' => 0.05,
                    '7' => 0.07,
                    '8' => 0.1,
                    '9' => 0.15,
                    _ => 0.2,
                };
            }
            _ => {
                self.colors.handle_key(code);
            }
        }
        false
    }
}
