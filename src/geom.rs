#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Vec2 {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Vec2 {
    pub(crate) const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub(crate) const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
    pub(crate) fn add(self, o: Vec2) -> Self {
        Self::new(self.x + o.x, self.y + o.y)
    }
    pub(crate) fn sub(self, o: Vec2) -> Self {
        Self::new(self.x - o.x, self.y - o.y)
    }
    pub(crate) fn mul(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }
    pub(crate) fn len2(self) -> f32 {
        self.x * self.x + self.y * self.y
    }
    pub(crate) fn len(self) -> f32 {
        self.len2().sqrt()
    }
    pub(crate) fn dist(self, o: Vec2) -> f32 {
        o.sub(self).len()
    }
    pub(crate) fn midpoint(self, o: Vec2) -> Self {
        Self::new((self.x + o.x) * 0.5, (self.y + o.y) * 0.5)
    }
    /// Point on the circle of radius `r` around `self` at `angle` radians.
    pub(crate) fn polar(self, angle: f32, r: f32) -> Self {
        Self::new(self.x + angle.cos() * r, self.y + angle.sin() * r)
    }
}

/// Viewport size in world pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Viewport {
    pub(crate) w: f32,
    pub(crate) h: f32,
}

impl Viewport {
    pub(crate) fn new(w: f32, h: f32) -> Self {
        Self {
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    /// Maps a normalized `[0,1]²` coordinate to pixels.
    pub(crate) fn to_px(self, n: Vec2) -> Vec2 {
        Vec2::new(n.x * self.w, n.y * self.h)
    }
}
