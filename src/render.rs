use crate::blob::Blob;
use crate::contour::ContourPoint;
use crate::surface::{Filter, Path, RadialGradient, Surface};

/// Gradient fades out at this multiple of the blob radius.
const GRADIENT_REACH: f32 = 1.5;
const MID_ALPHA: f32 = 0.6;

/// Fuses neighbouring blobs into one mass.
pub(crate) const LIQUID: Filter = Filter::BlurContrast {
    blur_px: 40.0,
    contrast: 1.8,
};

/// Smooth closed outline: each point is the control of a quadratic curve
/// ending halfway to the next point.
pub(crate) fn blob_path(points: &[ContourPoint]) -> Path {
    let mut path = Path::default();
    let Some(first) = points.first() else {
        return path;
    };
    path.move_to(first.pos);
    for (i, cur) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        path.quad_to(cur.pos, cur.pos.midpoint(next.pos));
    }
    path.close();
    path
}

pub(crate) fn blob_paint(blob: &Blob) -> RadialGradient {
    let c = blob.color;
    let mut g = RadialGradient::new(blob.pos, 0.0, blob.radius * GRADIENT_REACH);
    g.add_stop(0.0, c);
    g.add_stop(0.5, c.with_alpha(c.a * MID_ALPHA));
    g.add_stop(1.0, c.with_alpha(0.0));
    g
}

pub(crate) fn draw_blob<S: Surface + ?Sized>(surface: &mut S, blob: &Blob) {
    surface.fill(&blob_path(&blob.points), &blob_paint(blob));
}

/// One full frame: clear, draw every blob under `filter`, then drop the filter.
pub(crate) fn draw_frame<S: Surface + ?Sized>(surface: &mut S, blobs: &[Blob], filter: Filter) {
    surface.clear();
    surface.set_filter(filter);
    for b in blobs {
        draw_blob(surface, b);
    }
    surface.set_filter(Filter::None);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geom::{Vec2, Viewport};
    use crate::palette::{Theme, SEEDS};
    use crate::surface::PathOp;
    use rand::{rngs::StdRng, SeedableRng};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Resize(Viewport),
        Clear,
        Filter(Filter),
        Fill(Path, RadialGradient),
    }

    /// Records every call instead of drawing.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) calls: Vec<Call>,
    }

    impl Surface for Recorder {
        fn resize(&mut self, viewport: Viewport) {
            self.calls.push(Call::Resize(viewport));
        }
        fn clear(&mut self) {
            self.calls.push(Call::Clear);
        }
        fn set_filter(&mut self, filter: Filter) {
            self.calls.push(Call::Filter(filter));
        }
        fn fill(&mut self, path: &Path, paint: &RadialGradient) {
            self.calls.push(Call::Fill(path.clone(), paint.clone()));
        }
    }

    fn blob() -> Blob {
        let mut rng = StdRng::seed_from_u64(5);
        let mut b = Blob::spawn(Vec2::new(300.0, 200.0), 150.0, SEEDS[3].color(Theme::Dark), &mut rng);
        crate::contour::reshape(&mut b.points, b.pos, b.radius, b.wobble, 1.0);
        b
    }

    #[test]
    fn path_curves_through_midpoints() {
        let b = blob();
        let path = blob_path(&b.points);
        let ops = path.ops();
        let n = b.points.len();
        assert_eq!(ops.len(), n + 2);
        assert_eq!(ops[0], PathOp::MoveTo(b.points[0].pos));
        for i in 0..n {
            let next = b.points[(i + 1) % n].pos;
            assert_eq!(
                ops[i + 1],
                PathOp::QuadTo {
                    ctrl: b.points[i].pos,
                    to: b.points[i].pos.midpoint(next),
                }
            );
        }
        assert_eq!(ops[n + 1], PathOp::Close);
    }

    #[test]
    fn empty_contour_draws_nothing() {
        assert!(blob_path(&[]).ops().is_empty());
    }

    #[test]
    fn paint_uses_three_stops() {
        let b = blob();
        let g = blob_paint(&b);
        assert_eq!(g.center, b.pos);
        assert_eq!(g.r0, 0.0);
        assert!((g.r1 - b.radius * 1.5).abs() < 1e-4);
        let alphas: Vec<_> = g.stops.iter().map(|s| (s.offset, s.color.a)).collect();
        assert_eq!(alphas, vec![(0.0, 0.22), (0.5, 0.22 * 0.6), (1.0, 0.0)]);
    }

    #[test]
    fn frame_brackets_draws_with_filter() {
        let blobs = vec![blob(), blob(), blob()];
        let mut rec = Recorder::default();
        draw_frame(&mut rec, &blobs, LIQUID);

        assert_eq!(rec.calls.len(), 3 + blobs.len());
        assert_eq!(rec.calls[0], Call::Clear);
        assert_eq!(rec.calls[1], Call::Filter(LIQUID));
        assert!(rec.calls[2..2 + blobs.len()].iter().all(|c| matches!(c, Call::Fill(..))));
        assert_eq!(rec.calls.last(), Some(&Call::Filter(Filter::None)));
    }
}
