//! Motes rising out of the tunnel mouth.
//!
//! The pool size never changes; a particle that climbs past the top of its area
//! is recycled in place.

use crate::aperture::MouthRegion;
use crate::canvas::Canvas;
use crate::config::RecycleMode;
use image::Rgba;
use rand::prelude::*;
use serde::Serialize;

// Particle generation constants
const MIN_RADIUS: f32 = 0.5;
const RADIUS_RANGE: f32 = 4.0;
const MIN_SPEED: f32 = 0.5;
const SPEED_RANGE: f32 = 1.0;

/// Where particles start and where they drift to
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SpawnArea {
    pub start_x: f32,
    pub start_width: f32,
    pub end_x: f32,
    pub end_width: f32,
    pub height: f32,
}

impl SpawnArea {
    /// Narrow band at the bottom widening fourfold toward the top, centered on the viewport
    pub fn around_mouth(mouth_half_width: f32, viewport_width: f32, viewport_height: f32, height_fraction: f32) -> Self {
        let start_width = mouth_half_width * 0.5;
        let end_width = mouth_half_width * 2.0;
        Self {
            start_x: (viewport_width - start_width) / 2.0,
            start_width,
            end_x: (viewport_width - end_width) / 2.0,
            end_width,
            height: viewport_height * height_fraction,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub spawn_x: f32,
    pub drift_delta_x: f32,
    pub y: f32,
    pub vertical_speed: f32,
    pub progress: f32,
    pub radius: f32,
    pub color: Rgba<u8>,
}

impl Particle {
    pub fn spawn(area: &SpawnArea, at_random_height: bool, rgb: [u8; 3], rng: &mut StdRng) -> Self {
        let spawn_x = area.start_x + area.start_width * rng.gen::<f32>();
        let end_x = area.end_x + area.end_width * rng.gen::<f32>();
        let y = if at_random_height {
            area.height * rng.gen::<f32>()
        } else {
            area.height
        };
        let radius = MIN_RADIUS + RADIUS_RANGE * rng.gen::<f32>();
        let vertical_speed = MIN_SPEED + SPEED_RANGE * rng.gen::<f32>();
        let alpha = (rng.gen::<f32>() * 255.0).round() as u8;

        Self {
            x: spawn_x,
            spawn_x,
            drift_delta_x: end_x - spawn_x,
            y,
            vertical_speed,
            progress: 0.0,
            radius,
            color: Rgba([rgb[0], rgb[1], rgb[2], alpha]),
        }
    }
}

pub struct ParticleStream {
    pub area: SpawnArea,
    pub particles: Vec<Particle>,
    pub recycle: RecycleMode,
    rgb: [u8; 3],
}

impl ParticleStream {
    /// Fill the pool, scattered over the whole travel height
    pub fn seed(area: SpawnArea, count: usize, rgb: [u8; 3], recycle: RecycleMode, rng: &mut StdRng) -> Self {
        let particles = (0..count)
            .map(|_| Particle::spawn(&area, true, rgb, rng))
            .collect();
        Self { area, particles, recycle, rgb }
    }

    /// Scatter every particle again without changing the pool size
    pub fn reseed(&mut self, rng: &mut StdRng) {
        for p in &mut self.particles {
            *p = Particle::spawn(&self.area, true, self.rgb, rng);
        }
    }

    /// Recolor in place; each particle keeps its own alpha
    pub fn set_tint(&mut self, rgb: [u8; 3]) {
        self.rgb = rgb;
        for p in &mut self.particles {
            p.color = Rgba([rgb[0], rgb[1], rgb[2], p.color.0[3]]);
        }
    }

    /// Advance one tick. Returns how many particles were recycled.
    pub fn update(&mut self, rng: &mut StdRng) -> usize {
        let area = self.area;
        let mut recycled = 0;

        for p in &mut self.particles {
            p.progress = if area.height > 0.0 { 1.0 - p.y / area.height } else { 0.0 };
            p.x = p.spawn_x + p.drift_delta_x * p.progress;
            p.y -= p.vertical_speed;

            if p.y < 0.0 {
                let fresh = Particle::spawn(&area, false, self.rgb, rng);
                match self.recycle {
                    RecycleMode::Respawn => *p = fresh,
                    RecycleMode::KeepDrift => p.y = fresh.y,
                }
                recycled += 1;
            }
        }

        recycled
    }

    pub fn draw(&self, canvas: &mut Canvas, mouth: &MouthRegion) {
        canvas.clip(*mouth);
        for p in &self.particles {
            canvas.fill_rect(p.x, p.y, p.radius, p.radius, p.color);
        }
        canvas.reset_clip();
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
