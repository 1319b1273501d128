use crate::geom::Vec2;

/// Pointer influence ends at this many pixels from the blob centre.
pub(crate) const ATTRACTION_RADIUS: f32 = 400.0;
pub(crate) const POINTER_PULL: f32 = 0.3;

pub(crate) const COHESION: f32 = 0.02;
/// Cohesion reaches out to this multiple of the summed radii.
pub(crate) const COHESION_REACH: f32 = 1.5;
pub(crate) const REPULSION: f32 = 0.5;

pub(crate) const DAMPING: f32 = 0.95;
pub(crate) const RESTITUTION: f32 = 0.5;

/// The part of a blob the force model cares about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Body {
    pub(crate) pos: Vec2,
    pub(crate) radius: f32,
}

/// Unit direction and distance from `from` to `to`, or `None` when the two
/// points coincide.
fn heading(from: Vec2, to: Vec2) -> Option<(Vec2, f32)> {
    let d = to.sub(from);
    let dist = d.len();
    if dist > 0.0 && dist.is_finite() {
        Some((d.mul(1.0 / dist), dist))
    } else {
        None
    }
}

/// Pull toward the pointer, fading linearly to zero at `ATTRACTION_RADIUS`.
pub(crate) fn pointer_pull(pos: Vec2, pointer_px: Vec2) -> Vec2 {
    match heading(pos, pointer_px) {
        Some((dir, dist)) if dist < ATTRACTION_RADIUS => {
            dir.mul((1.0 - dist / ATTRACTION_RADIUS) * POINTER_PULL)
        }
        _ => Vec2::ZERO,
    }
}

/// Force on `me` from `other`.
///
/// Cohesion and repulsion are checked independently, so an overlapping pair
/// gets both: a weak pull toward and a strong push away, netting a push.
pub(crate) fn pair_force(me: Body, other: Body) -> Vec2 {
    let Some((dir, dist)) = heading(me.pos, other.pos) else {
        return Vec2::ZERO;
    };
    let min_dist = me.radius + other.radius;
    let mut f = Vec2::ZERO;
    if dist < min_dist * COHESION_REACH {
        f = f.add(dir.mul(COHESION));
    }
    if dist < min_dist {
        f = f.sub(dir.mul(REPULSION));
    }
    f
}

/// Velocity change for one step: pointer attraction plus every pairwise term.
/// `others` must not contain `me` itself.
pub(crate) fn velocity_delta<I>(me: Body, others: I, pointer_px: Vec2) -> Vec2
where
    I: IntoIterator<Item = Body>,
{
    others
        .into_iter()
        .fold(pointer_pull(me.pos, pointer_px), |acc, o| acc.add(pair_force(me, o)))
}

pub(crate) fn damp(v: Vec2) -> Vec2 {
    v.mul(DAMPING)
}

/// Clamps one axis to `[radius, extent - radius]`, bouncing the velocity
/// back inward at half speed. On an axis narrower than the blob both clamps
/// fire and the far wall wins.
pub(crate) fn reflect_axis(pos: &mut f32, vel: &mut f32, radius: f32, extent: f32) {
    if *pos < radius {
        *pos = radius;
        *vel = vel.abs() * RESTITUTION;
    }
    if *pos > extent - radius {
        *pos = extent - radius;
        *vel = -vel.abs() * RESTITUTION;
    }
}
