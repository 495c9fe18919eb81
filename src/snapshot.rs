//! Offscreen hosts: render frames to a PNG, or dump the derived geometry as JSON

use crate::aperture::Aperture;
use crate::canvas::Canvas;
use crate::config::{InspectConfig, SnapshotConfig, TunnelConfig};
use crate::disc::DiscShape;
use crate::error::{Error, Result};
use crate::particles::SpawnArea;
use crate::tunnel::{FrameDriver, FrameToken, Tunnel, Viewport};
use rand::prelude::*;
use serde::Serialize;

/// Driver that grants a fixed number of frames and then stops firing
pub struct HeadlessDriver {
    budget: u32,
    next_id: u64,
    pending: Option<FrameToken>,
}

impl HeadlessDriver {
    pub fn new(frames: u32) -> Self {
        Self { budget: frames, next_id: 0, pending: None }
    }

    /// Fire the pending frame if any budget remains
    pub fn fire(&mut self) -> Option<FrameToken> {
        if self.budget == 0 {
            return None;
        }
        let token = self.pending.take()?;
        self.budget -= 1;
        Some(token)
    }
}

impl FrameDriver for HeadlessDriver {
    fn request_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        let token = FrameToken(self.next_id);
        self.pending = Some(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }
}

fn seed_or_now(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    })
}

/// Mount a tunnel on an offscreen canvas and run `frames` ticks
pub fn render_frames(
    tunnel_config: TunnelConfig,
    viewport: Viewport,
    frames: u32,
    seed: u64,
) -> (Tunnel, Option<Canvas>) {
    let mut tunnel = Tunnel::new(tunnel_config, StdRng::seed_from_u64(seed));
    let mut driver = HeadlessDriver::new(frames);
    let mut canvas = viewport.canvas();

    tunnel.mount(viewport, &mut driver);
    while driver.fire().is_some() {
        tunnel.frame(canvas.as_mut(), &mut driver);
    }
    (tunnel, canvas)
}

/// Render frames and write the last one as a PNG
pub fn snapshot(config: SnapshotConfig) -> Result<()> {
    let seed = seed_or_now(config.seed);
    let viewport = Viewport::new(config.width, config.height, config.scale);
    let drawable = !viewport.is_empty() && config.scale > 0.0;
    if drawable && Canvas::raster_size(config.width, config.height, config.scale).is_none() {
        return Err(Error::CanvasTooLarge {
            width: config.width,
            height: config.height,
            scale: config.scale,
        });
    }
    let (mut tunnel, canvas) = render_frames(config.tunnel, viewport, config.frames.max(1), seed);

    let Some(canvas) = canvas else {
        log::warn!("viewport {}x{} is empty; nothing to write", config.width, config.height);
        return Ok(());
    };
    canvas.flatten(config.background).save(&config.output)?;
    log::info!(
        "wrote {} ({}x{}, {} frames, seed {})",
        config.output.display(),
        canvas.width(),
        canvas.height(),
        tunnel.frames(),
        seed
    );

    let mut driver = HeadlessDriver::new(0);
    tunnel.unmount(&mut driver);
    Ok(())
}

#[derive(Serialize)]
pub struct Geometry {
    pub viewport: Viewport,
    pub start_disc: DiscShape,
    pub end_disc: DiscShape,
    pub discs: usize,
    pub aperture: Aperture,
    pub spawn_area: SpawnArea,
    pub lines: usize,
    pub points_per_line: usize,
    pub particles: usize,
}

/// Derived geometry for a freshly mounted tunnel
pub fn geometry(config: &InspectConfig) -> Option<Geometry> {
    let viewport = Viewport::new(config.width, config.height, 1.0);
    let (tunnel, _) = render_frames(config.tunnel.clone(), viewport, 0, seed_or_now(config.seed));
    let scene = tunnel.scene()?;
    Some(Geometry {
        viewport,
        start_disc: scene.discs.start,
        end_disc: scene.discs.end,
        discs: scene.discs.len(),
        aperture: scene.aperture,
        spawn_area: scene.particles.area,
        lines: scene.grid.len(),
        points_per_line: scene.grid.lines.first().map_or(0, Vec::len),
        particles: scene.particles.len(),
    })
}

pub fn inspect(config: InspectConfig) -> Result<()> {
    if let Some(geometry) = geometry(&config) {
        println!("{}", serde_json::to_string_pretty(&geometry)?);
    }
    Ok(())
}
