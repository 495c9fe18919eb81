use image::Rgba;
use serde::Deserialize;
use std::path::PathBuf;

/// How a particle that rose past the top of its area is put back at the bottom
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecycleMode {
    /// Replace the whole particle with a fresh bottom spawn
    Respawn,
    /// Reset only `y`; the particle keeps its drift, size, speed and color
    KeepDrift,
}

/// Disc placement as fractions of the viewport size
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct DiscProportions {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Engine constants for one tunnel instance
#[derive(Clone, Debug, PartialEq)]
pub struct TunnelConfig {
    pub total_discs: usize,
    pub total_lines: usize,
    pub total_particles: usize,
    pub progress_step: f32,
    pub line_width: f32,
    pub stroke_color: Rgba<u8>,
    pub particle_rgb: [u8; 3],
    pub start: DiscProportions,
    pub end: DiscProportions,
    pub disc_stride: usize,      // draw every Nth disc
    pub clip_margin: f32,        // discs narrower than aperture - margin get clipped
    pub spawn_height: f32,       // particle travel height as a fraction of viewport height
    pub recycle: RecycleMode,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            total_discs: 100,
            total_lines: 100,
            total_particles: 100,
            progress_step: 0.001,
            line_width: 2.0,
            stroke_color: Rgba([0x44, 0x44, 0x44, 0xff]),
            particle_rgb: [255, 255, 255],
            start: DiscProportions { x: 0.5, y: 0.45, w: 0.75, h: 0.7 },
            end: DiscProportions { x: 0.5, y: 0.95, w: 0.0, h: 0.0 },
            disc_stride: 5,
            clip_margin: 5.0,
            spawn_height: 0.85,
            recycle: RecycleMode::Respawn,
        }
    }
}

/// Configuration for the live terminal animation
#[derive(Clone)]
pub struct RunConfig {
    pub tunnel: TunnelConfig,
    pub time_step: f32,
    pub seed: Option<u64>,
    pub supersample: u32,
    pub scheme: u8,
    pub background: Rgba<u8>,
}

/// Configuration for offscreen PNG rendering
#[derive(Clone)]
pub struct SnapshotConfig {
    pub tunnel: TunnelConfig,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub frames: u32,
    pub seed: Option<u64>,
    pub output: PathBuf,
    pub background: Rgba<u8>,
}

/// Configuration for the geometry dump
#[derive(Clone)]
pub struct InspectConfig {
    pub tunnel: TunnelConfig,
    pub width: f32,
    pub height: f32,
    pub seed: Option<u64>,
}

/// Background behind the tunnel (zinc-900)
pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([0x18, 0x18, 0x1b, 0xff]);
