use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use crate::blob::{self, Blob};
use crate::geom::{Vec2, Viewport};
use crate::palette::Theme;
use crate::pointer::PointerTracker;
use crate::render;
use crate::surface::{Filter, Surface};

/// Simulated time per frame. Fixed so throttled frames don't jump.
pub(crate) const TIME_STEP: f32 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FrameHandle(pub(crate) u64);

/// Releases input listeners when disposed or dropped. Disposing twice is a no-op.
pub(crate) struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    pub(crate) fn dispose(&mut self) {
        if let Some(f) = self.dispose.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// The environment a backdrop lives in.
pub(crate) trait Host {
    type Surface: Surface;

    fn prefers_reduced_motion(&self) -> bool;
    fn viewport(&self) -> Viewport;
    /// `None` when no drawing surface can be had.
    fn create_surface(&mut self, viewport: Viewport) -> Option<Self::Surface>;
    /// Starts pointer, touch and resize delivery.
    fn subscribe(&mut self) -> anyhow::Result<Subscription>;
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
    fn present(&mut self, surface: &Self::Surface, theme: Theme) -> anyhow::Result<()>;
}

pub(crate) struct Running<S> {
    surface: S,
    pub(crate) blobs: Vec<Blob>,
    pub(crate) time: f32,
    pub(crate) pointer: PointerTracker,
    pub(crate) viewport: Viewport,
    resized: bool,
    pub(crate) theme: Theme,
    pending: Option<FrameHandle>,
    subscription: Subscription,
    pub(crate) frames: u64,
}

pub(crate) enum Phase<S> {
    Uninitialized,
    Running(Box<Running<S>>),
    Stopped,
}

/// Owns one animated blob field and its frame schedule.
pub(crate) struct Backdrop<S> {
    phase: Phase<S>,
    rng: StdRng,
    filter: Filter,
}

impl<S: Surface> Backdrop<S> {
    pub(crate) fn new(seed: u64, filter: Filter) -> Self {
        Self {
            phase: Phase::Uninitialized,
            rng: StdRng::seed_from_u64(seed),
            filter,
        }
    }

    pub(crate) fn running(&self) -> Option<&Running<S>> {
        match &self.phase {
            Phase::Running(run) => Some(&**run),
            _ => None,
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        matches!(self.phase, Phase::Stopped)
    }

    /// Starts the animation unless the host asks for reduced motion or cannot
    /// provide a surface; either way ends `Stopped` without side effects.
    pub(crate) fn mount<H: Host<Surface = S>>(&mut self, host: &mut H, theme: Theme) {
        if !matches!(self.phase, Phase::Uninitialized) {
            return;
        }
        self.phase = Phase::Stopped;

        if host.prefers_reduced_motion() {
            return;
        }
        let viewport = host.viewport();
        let Some(surface) = host.create_surface(viewport) else {
            return;
        };
        let Ok(subscription) = host.subscribe() else {
            return;
        };

        let blobs = blob::spawn_all(theme, viewport, &mut self.rng);
        let pending = Some(host.request_frame());
        info!(
            theme = theme.name(),
            blobs = blobs.len(),
            width = viewport.w,
            height = viewport.h,
            "backdrop running"
        );
        self.phase = Phase::Running(Box::new(Running {
            surface,
            blobs,
            time: 0.0,
            pointer: PointerTracker::default(),
            viewport,
            resized: false,
            theme,
            pending,
            subscription,
            frames: 0,
        }));
    }

    /// Cancels the pending frame and drops every listener. Safe to repeat.
    pub(crate) fn unmount<H: Host<Surface = S>>(&mut self, host: &mut H) {
        let Phase::Running(mut run) = std::mem::replace(&mut self.phase, Phase::Stopped) else {
            return;
        };
        if let Some(h) = run.pending.take() {
            host.cancel_frame(h);
        }
        run.subscription.dispose();
        info!(frames = run.frames, "backdrop stopped");
    }

    /// A theme change rebuilds everything; blob state is not carried over.
    pub(crate) fn set_theme<H: Host<Surface = S>>(&mut self, host: &mut H, theme: Theme) {
        match &self.phase {
            Phase::Running(run) if run.theme != theme => {}
            _ => return,
        }
        debug!(theme = theme.name(), "rebuilding backdrop for theme");
        self.unmount(host);
        self.phase = Phase::Uninitialized;
        self.mount(host, theme);
    }

    /// Pointer or primary touch in normalized viewport coordinates.
    pub(crate) fn on_pointer(&mut self, at: Vec2) {
        if let Phase::Running(run) = &mut self.phase {
            run.pointer.set_target(at);
        }
    }

    pub(crate) fn on_resize(&mut self, viewport: Viewport) {
        if let Phase::Running(run) = &mut self.phase {
            run.viewport = viewport;
            run.resized = true;
        }
    }

    /// Runs the frame for `handle`. Stale or cancelled handles do nothing.
    pub(crate) fn on_frame<H: Host<Surface = S>>(
        &mut self,
        host: &mut H,
        handle: FrameHandle,
    ) -> anyhow::Result<()> {
        let Phase::Running(run) = &mut self.phase else {
            return Ok(());
        };
        if run.pending != Some(handle) {
            return Ok(());
        }
        run.pending = None;

        if run.resized {
            run.resized = false;
            run.surface.resize(run.viewport);
            debug!(width = run.viewport.w, height = run.viewport.h, "surface resized");
        }

        run.time += TIME_STEP;
        let pointer = run.viewport.to_px(run.pointer.tick());
        blob::step_all(&mut run.blobs, run.time, pointer, run.viewport);
        render::draw_frame(&mut run.surface, &run.blobs, self.filter);
        run.frames += 1;

        host.present(&run.surface, run.theme)?;
        run.pending = Some(host.request_frame());
        Ok(())
    }
}
