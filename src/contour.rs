use std::f32::consts::TAU;

use rand::Rng;

use crate::geom::Vec2;

/// Angular speed of the whole outline, radians per unit of sim time.
pub(crate) const SPIN: f32 = 0.3;
const BREATH_RATE: f32 = 0.5;
pub(crate) const BREATH_DEPTH: f32 = 0.1;
/// Upper bound of the random phase added to each evenly spaced angle.
const PHASE_JITTER: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ContourPoint {
    /// Fixed at creation; includes the random phase offset.
    pub(crate) angle: f32,
    pub(crate) pos: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Wobble {
    pub(crate) speed: f32,
    pub(crate) amount: f32,
}

impl Wobble {
    pub(crate) fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            speed: rng.gen_range(0.02..0.04),
            amount: rng.gen_range(20.0..40.0),
        }
    }
}

/// `n` points evenly spaced around the circle, each nudged by its own phase.
pub(crate) fn seed_points<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<ContourPoint> {
    let step = TAU / n.max(1) as f32;
    (0..n)
        .map(|i| ContourPoint {
            angle: step * i as f32 + rng.gen_range(0.0..PHASE_JITTER),
            pos: Vec2::ZERO,
        })
        .collect()
}

/// Radius for `time`. Stays within ±10% of `base`, so it is positive
/// whenever `base` is.
pub(crate) fn breathe(base: f32, time: f32) -> f32 {
    base * ((time * BREATH_RATE).sin() * BREATH_DEPTH + 1.0)
}

pub(crate) fn point_at(center: Vec2, radius: f32, angle: f32, wobble: Wobble, time: f32) -> Vec2 {
    let r = radius + (time * wobble.speed + angle).sin() * wobble.amount;
    center.polar(angle + time * SPIN, r)
}

pub(crate) fn reshape(
    points: &mut [ContourPoint],
    center: Vec2,
    radius: f32,
    wobble: Wobble,
    time: f32,
) {
    for p in points {
        p.pos = point_at(center, radius, p.angle, wobble, time);
    }
}
