//! Live tunnel in the terminal
//!
//! Controls:
//! - 1-9, 0: Speed
//! - Shift+1-9, Shift+0: Color scheme
//! - Space: Pause
//! - R: Scatter particles again
//! - I: Toggle info line
//! - Q/Esc: Quit

use super::halfblock::{render_halfblock, Surface};
use super::VizState;
use crate::colors::scheme_palette;
use crate::config::RunConfig;
use crate::error::Result;
use crate::terminal::{TermEvent, Terminal};
use crate::tunnel::{FrameDriver, FrameToken, Tunnel};
use crossterm::event::KeyCode;
use crossterm::style::Color;
use rand::prelude::*;
use std::time::{Duration, Instant};

/// Longest frame interval the scheduler will wait
pub const MAX_FRAME_SECONDS: f32 = 10.0;

/// Frame interval for a seconds value; NaN and negatives mean no wait
pub fn frame_interval(seconds: f32) -> Duration {
    if seconds.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f32(seconds.clamp(0.0, MAX_FRAME_SECONDS))
}

/// Frame scheduler paced by a fixed interval
pub struct PacedDriver {
    interval: Duration,
    next_id: u64,
    pending: Option<(FrameToken, Instant)>,
    last_fire: Instant,
}

impl PacedDriver {
    pub fn new(seconds: f32) -> Self {
        Self {
            interval: frame_interval(seconds),
            next_id: 0,
            pending: None,
            last_fire: Instant::now(),
        }
    }

    pub fn set_interval(&mut self, seconds: f32) {
        self.interval = frame_interval(seconds);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Sleep until the pending frame is due and hand out its token
    pub fn wait(&mut self) -> Option<FrameToken> {
        let (token, due) = self.pending.take()?;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        self.last_fire = Instant::now();
        Some(token)
    }
}

impl FrameDriver for PacedDriver {
    fn request_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        let token = FrameToken(self.next_id);
        self.pending = Some((token, self.last_fire + self.interval));
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending.is_some_and(|(pending, _)| pending == token) {
            self.pending = None;
        }
    }
}

/// Run the tunnel until the user quits
pub fn run(config: RunConfig) -> Result<()> {
    let seed = config.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    });
    log::info!("tunnel seed {}", seed);

    let mut term = Terminal::new(true)?;
    term.clear_screen()?;

    let mut state = VizState::new(config.time_step, config.scheme);
    let mut tunnel = Tunnel::new(config.tunnel.clone(), StdRng::seed_from_u64(seed));
    tunnel.set_palette(scheme_palette(state.color_scheme(), &config.tunnel));

    let mut driver = PacedDriver::new(state.speed);
    let (cols, rows) = term.size();
    let mut surface = Surface::new(cols, rows, config.supersample);
    tunnel.mount(surface.viewport, &mut driver);

    'outer: loop {
        let mut measured = crossterm::terminal::size().unwrap_or(term.size());

        while let Some(event) = term.poll_event()? {
            match event {
                TermEvent::Resize(w, h) => measured = (w, h),
                TermEvent::Key(code, mods) => {
                    if state.handle_key(code, mods) {
                        break 'outer;
                    }
                    if let KeyCode::Char('r') | KeyCode::Char('R') = code {
                        tunnel.reseed_particles();
                    }
                }
            }
        }

        if measured != term.size() {
            let (width, height) = measured;
            term.resize(width, height);
            term.clear_screen()?;
            surface = Surface::new(width, height, config.supersample);
            tunnel.resize(surface.viewport);
        }

        tunnel.set_palette(scheme_palette(state.color_scheme(), &config.tunnel));
        driver.set_interval(state.speed);

        if state.paused {
            term.sleep(0.1);
            continue;
        }

        if driver.wait().is_none() {
            break;
        }
        tunnel.frame(surface.canvas.as_mut(), &mut driver);

        term.clear();
        if let Some(pixels) = surface.downsample(config.background) {
            render_halfblock(&mut term, &pixels);
        }
        if state.show_info {
            draw_info(&mut term, &tunnel, &state);
        }

        if let Err(e) = term.present() {
            log::warn!("failed to present frame {}: {}", tunnel.frames(), e);
        }
    }

    tunnel.unmount(&mut driver);
    Ok(())
}

fn draw_info(term: &mut Terminal, tunnel: &Tunnel, state: &VizState) {
    let Some(scene) = tunnel.scene() else {
        return;
    };
    let label = format!(
        "termhole  mouth {}/{}  particles {}  frame {}  scheme {}  {:.0}fps",
        scene.aperture.index,
        scene.discs.len(),
        scene.particles.len(),
        tunnel.frames(),
        state.color_scheme(),
        1.0 / state.speed.max(0.001),
    );
    for (i, ch) in label.chars().enumerate() {
        term.set_with_bg(1 + i as i32, 0, ch, Some(Color::Grey), Some(Color::Black));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_only_drops_matching_token() {
        let mut driver = PacedDriver::new(0.0);
        let first = driver.request_frame();
        driver.cancel_frame(FrameToken(first.0 + 1));
        assert!(driver.has_pending());
        driver.cancel_frame(first);
        assert!(!driver.has_pending());
        assert!(driver.wait().is_none());
    }

    #[test]
    fn out_of_range_intervals_are_clamped() {
        assert_eq!(frame_interval(f32::INFINITY), Duration::from_secs_f32(MAX_FRAME_SECONDS));
        assert_eq!(frame_interval(1e30), Duration::from_secs_f32(MAX_FRAME_SECONDS));
        assert_eq!(frame_interval(f32::NAN), Duration::ZERO);
        assert_eq!(frame_interval(-1.0), Duration::ZERO);
        assert_eq!(frame_interval(0.5), Duration::from_millis(500));

        let mut driver = PacedDriver::new(f32::INFINITY);
        driver.set_interval(f32::NEG_INFINITY);
        driver.set_interval(1e30);
        assert!(!driver.has_pending());
    }

    #[test]
    fn wait_hands_out_the_latest_request() {
        let mut driver = PacedDriver::new(0.0);
        driver.request_frame();
        let second = driver.request_frame();
        assert_eq!(driver.wait(), Some(second));
        assert!(!driver.has_pending());
    }
}
