//! Tunnel cross-sections and their progression toward the vanishing point

use crate::config::DiscProportions;
use crate::easing::{tween, Easing};
use serde::Serialize;

/// Ellipse geometry of a reference disc
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DiscShape {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl DiscShape {
    /// Resolve proportions against a viewport size
    pub fn from_proportions(p: &DiscProportions, width: f32, height: f32) -> Self {
        Self {
            x: width * p.x,
            y: height * p.y,
            w: width * p.w,
            h: height * p.h,
        }
    }
}

/// One cross-section of the tunnel. Geometry is always derived from `progress`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Disc {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub progress: f32,
}

impl Disc {
    pub fn at(progress: f32, start: &DiscShape, end: &DiscShape) -> Self {
        let mut disc = Self { progress, ..Self::default() };
        disc.tween(start, end);
        disc
    }

    /// Recompute geometry from progress. Vertical motion accelerates, the rest is linear.
    pub fn tween(&mut self, start: &DiscShape, end: &DiscShape) {
        let p = self.progress;
        self.x = tween(start.x, end.x, p, Easing::Linear);
        self.y = tween(start.y, end.y, p, Easing::InExpo);
        self.w = tween(start.w, end.w, p, Easing::Linear);
        self.h = tween(start.h, end.h, p, Easing::Linear);
    }

    /// Step progress forward, wrapping at 1
    pub fn advance(&mut self, step: f32, start: &DiscShape, end: &DiscShape) {
        self.progress = (self.progress + step).rem_euclid(1.0);
        self.tween(start, end);
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn shape(&self) -> DiscShape {
        DiscShape { x: self.x, y: self.y, w: self.w, h: self.h }
    }
}

/// The disc stack together with the two reference discs it tweens between
#[derive(Clone, Debug)]
pub struct DiscStack {
    pub start: DiscShape,
    pub end: DiscShape,
    pub discs: Vec<Disc>,
}

impl DiscStack {
    pub fn build(start: DiscShape, end: DiscShape, total: usize) -> Self {
        let discs = (0..total)
            .map(|i| Disc::at(i as f32 / total as f32, &start, &end))
            .collect();
        Self { start, end, discs }
    }

    pub fn advance(&mut self, step: f32) {
        let (start, end) = (self.start, self.end);
        for disc in &mut self.discs {
            disc.advance(step, &start, &end);
        }
    }

    pub fn len(&self) -> usize {
        self.discs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discs.is_empty()
    }
}
