use crate::geom::Vec2;

/// Fraction of the remaining gap closed per frame.
const EASE: f32 = 0.08;

/// Chases the latest pointer position in normalized `[0,1]²` space.
///
/// Input only ever writes `target`; `smoothed` moves in `tick`, once per frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PointerTracker {
    smoothed: Vec2,
    target: Vec2,
}

impl Default for PointerTracker {
    fn default() -> Self {
        let centre = Vec2::new(0.5, 0.5);
        Self {
            smoothed: centre,
            target: centre,
        }
    }
}

impl PointerTracker {
    /// Latest input wins; earlier targets since the last tick are dropped.
    pub(crate) fn set_target(&mut self, target: Vec2) {
        if target.x.is_finite() && target.y.is_finite() {
            self.target = target;
        }
    }

    pub(crate) fn tick(&mut self) -> Vec2 {
        self.smoothed = self.smoothed.add(self.target.sub(self.smoothed).mul(EASE));
        self.smoothed
    }

    #[cfg(test)]
    pub(crate) fn smoothed(&self) -> Vec2 {
        self.smoothed
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Vec2 {
        self.target
    }
}
