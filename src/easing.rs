//! Easing curves used to tween disc geometry

/// Identity curve
pub fn linear(t: f32) -> f32 {
    t
}

/// Exponential ease-in: flat near 0, steep near 1
pub fn ease_in_expo(t: f32) -> f32 {
    if t == 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * (t - 1.0))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Easing {
    Linear,
    InExpo,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => linear(t),
            Easing::InExpo => ease_in_expo(t),
        }
    }
}

/// Interpolate from `start` to `end` along the eased progress `p`
pub fn tween(start: f32, end: f32, p: f32, easing: Easing) -> f32 {
    start + (end - start) * easing.apply(p)
}
