use rand::Rng;

use crate::contour::{self, ContourPoint, Wobble};
use crate::forces::{self, Body};
use crate::geom::{Vec2, Viewport};
use crate::palette::{Rgba, Theme, SEEDS};

const MIN_POINTS: usize = 8;
const MAX_POINTS: usize = 11;
const INITIAL_SPEED: f32 = 0.25;

#[derive(Clone, Debug)]
pub(crate) struct Blob {
    pub(crate) pos: Vec2,
    pub(crate) vel: Vec2,
    pub(crate) radius: f32,
    pub(crate) base_radius: f32,
    pub(crate) color: Rgba,
    pub(crate) points: Vec<ContourPoint>,
    pub(crate) wobble: Wobble,
}

impl Blob {
    pub(crate) fn spawn<R: Rng + ?Sized>(pos: Vec2, radius: f32, color: Rgba, rng: &mut R) -> Self {
        let vel = Vec2::new(
            rng.gen_range(-INITIAL_SPEED..INITIAL_SPEED),
            rng.gen_range(-INITIAL_SPEED..INITIAL_SPEED),
        );
        let n = rng.gen_range(MIN_POINTS..=MAX_POINTS);
        let wobble = Wobble::random(rng);
        let points = contour::seed_points(n, rng);
        Self {
            pos,
            vel,
            radius,
            base_radius: radius,
            color,
            points,
            wobble,
        }
    }

    pub(crate) fn body(&self) -> Body {
        Body {
            pos: self.pos,
            radius: self.radius,
        }
    }

    /// Integrate `dv`, damp, keep inside the viewport, then refresh the outline.
    fn advance(&mut self, dv: Vec2, time: f32, viewport: Viewport) {
        self.vel = self.vel.add(dv);
        self.pos = self.pos.add(self.vel);
        self.vel = forces::damp(self.vel);

        forces::reflect_axis(&mut self.pos.x, &mut self.vel.x, self.radius, viewport.w);
        forces::reflect_axis(&mut self.pos.y, &mut self.vel.y, self.radius, viewport.h);

        contour::reshape(&mut self.points, self.pos, self.radius, self.wobble, time);
    }
}

/// The fixed blob set for `theme`, laid out over `viewport`.
pub(crate) fn spawn_all<R: Rng + ?Sized>(theme: Theme, viewport: Viewport, rng: &mut R) -> Vec<Blob> {
    SEEDS
        .iter()
        .map(|s| {
            let pos = viewport.to_px(Vec2::new(s.at.0, s.at.1));
            Blob::spawn(pos, s.radius, s.color(theme), rng)
        })
        .collect()
}

/// Advances every blob one step, in order. Each blob sees the others as they
/// are at its turn, so earlier blobs have already moved.
pub(crate) fn step_all(blobs: &mut [Blob], time: f32, pointer_px: Vec2, viewport: Viewport) {
    for i in 0..blobs.len() {
        blobs[i].radius = contour::breathe(blobs[i].base_radius, time);

        let me = blobs[i].body();
        let others = blobs
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, b)| b.body());
        let dv = forces::velocity_delta(me, others, pointer_px);

        blobs[i].advance(dv, time, viewport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn still(x: f32, y: f32, radius: f32) -> Blob {
        let mut rng = StdRng::seed_from_u64(1);
        let mut b = Blob::spawn(Vec2::new(x, y), radius, SEEDS[0].color(Theme::Dark), &mut rng);
        b.vel = Vec2::ZERO;
        b
    }

    fn far_pointer() -> Vec2 {
        Vec2::new(-10_000.0, -10_000.0)
    }

    #[test]
    fn spawn_draws_constants_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let b = Blob::spawn(Vec2::ZERO, 100.0, SEEDS[2].color(Theme::Light), &mut rng);
            assert!((MIN_POINTS..=MAX_POINTS).contains(&b.points.len()));
            assert!(b.wobble.speed >= 0.02 && b.wobble.speed < 0.04);
            assert!(b.wobble.amount >= 20.0 && b.wobble.amount < 40.0);
            assert!(b.vel.x.abs() <= INITIAL_SPEED && b.vel.y.abs() <= INITIAL_SPEED);
            assert_eq!(b.radius, b.base_radius);
        }
    }

    #[test]
    fn overlapping_pair_separates_in_one_step() {
        let vp = Viewport::new(2000.0, 2000.0);
        let mut blobs = vec![still(1000.0, 1000.0, 50.0), still(1010.0, 1000.0, 50.0)];
        let before = blobs[0].pos.dist(blobs[1].pos);
        step_all(&mut blobs, 0.02, far_pointer(), vp);
        let after = blobs[0].pos.dist(blobs[1].pos);
        assert!(after > before, "{after} <= {before}");
    }

    #[test]
    fn overlapping_pairs_separate_from_any_angle() {
        let vp = Viewport::new(4000.0, 4000.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let ra = rng.gen_range(40.0f32..120.0);
            let rb = rng.gen_range(40.0f32..120.0);
            let d = rng.gen_range(1.0..(ra + rb) * 0.9);
            let theta: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
            let a = still(2000.0, 2000.0, ra);
            let mut b = still(0.0, 0.0, rb);
            b.pos = a.pos.polar(theta, d);
            let mut blobs = vec![a, b];
            let before = blobs[0].pos.dist(blobs[1].pos);
            step_all(&mut blobs, 0.0, far_pointer(), vp);
            assert!(blobs[0].pos.dist(blobs[1].pos) > before);
        }
    }

    #[test]
    fn long_run_keeps_invariants() {
        let vp = Viewport::new(1280.0, 720.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut blobs = spawn_all(Theme::Dark, vp, &mut rng);
        let snapshot: Vec<_> = blobs
            .iter()
            .map(|b| (b.points.len(), b.points.iter().map(|p| p.angle).collect::<Vec<_>>(), b.wobble))
            .collect();

        let mut time = 0.0;
        for frame in 0..3000 {
            time += 0.02;
            let pointer = Vec2::new(rng.gen_range(0.0f32..1.0) * vp.w, rng.gen_range(0.0f32..1.0) * vp.h);
            let pointer = if frame % 3 == 0 { pointer } else { vp.to_px(Vec2::new(0.5, 0.5)) };
            step_all(&mut blobs, time, pointer, vp);

            for b in &blobs {
                assert!(b.radius > 0.0);
                assert!(b.pos.x >= b.radius && b.pos.x <= vp.w - b.radius);
                assert!(b.pos.y >= b.radius && b.pos.y <= vp.h - b.radius);
            }
        }

        let later: Vec<_> = blobs
            .iter()
            .map(|b| (b.points.len(), b.points.iter().map(|p| p.angle).collect::<Vec<_>>(), b.wobble))
            .collect();
        assert_eq!(snapshot, later);
        assert_eq!(blobs.len(), SEEDS.len());
    }

    #[test]
    fn short_viewport_keeps_blobs_moving() {
        // shorter than the largest blobs are wide
        let vp = Viewport::new(640.0, 384.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut blobs = spawn_all(Theme::Dark, vp, &mut rng);
        let mut pinned = vec![0usize; blobs.len()];
        let mut time = 0.0;
        for _ in 0..1000 {
            time += 0.02;
            step_all(&mut blobs, time, vp.to_px(Vec2::new(0.5, 0.5)), vp);
            for (i, b) in blobs.iter().enumerate() {
                assert!(b.pos.y.is_finite() && b.vel.y.is_finite());
                if b.pos.y == vp.h * 0.5 && b.vel.y == 0.0 {
                    pinned[i] += 1;
                }
            }
        }
        assert_eq!(pinned, vec![0; blobs.len()]);
        for b in &blobs {
            if b.radius * 2.0 > vp.h {
                assert!((b.pos.y - (vp.h - b.radius)).abs() < 1e-3);
                assert!(b.vel.y <= 0.0);
            }
        }
    }

    #[test]
    fn contour_follows_the_blob() {
        let vp = Viewport::new(1000.0, 1000.0);
        let mut blobs = vec![still(500.0, 500.0, 100.0)];
        step_all(&mut blobs, 1.0, far_pointer(), vp);
        let b = &blobs[0];
        let reach = b.radius + b.wobble.amount + 1e-3;
        for p in &b.points {
            assert!(b.pos.dist(p.pos) <= reach);
        }
    }

    #[test]
    fn out_of_bounds_blob_is_pulled_back() {
        // e.g. after the viewport shrank
        let vp = Viewport::new(600.0, 400.0);
        let mut blobs = vec![still(900.0, 700.0, 80.0)];
        blobs[0].vel = Vec2::new(3.0, 3.0);
        step_all(&mut blobs, 0.5, far_pointer(), vp);
        let b = &blobs[0];
        assert!((b.pos.x - (vp.w - b.radius)).abs() < 1e-3);
        assert!((b.pos.y - (vp.h - b.radius)).abs() < 1e-3);
        assert!(b.vel.x < 0.0 && b.vel.y < 0.0);
    }
}
