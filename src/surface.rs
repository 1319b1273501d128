use crate::geom::{Vec2, Viewport};
use crate::palette::Rgba;

/// Straight line segments per quadratic curve when flattening paths.
const CURVE_STEPS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Filter {
    None,
    /// Gaussian blur (standard deviation in world pixels) then colour contrast.
    BlurContrast { blur_px: f32, contrast: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum PathOp {
    MoveTo(Vec2),
    QuadTo { ctrl: Vec2, to: Vec2 },
    Close,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Path {
    ops: Vec<PathOp>,
}

impl Path {
    pub(crate) fn move_to(&mut self, p: Vec2) {
        self.ops.push(PathOp::MoveTo(p));
    }
    pub(crate) fn quad_to(&mut self, ctrl: Vec2, to: Vec2) {
        self.ops.push(PathOp::QuadTo { ctrl, to });
    }
    pub(crate) fn close(&mut self) {
        self.ops.push(PathOp::Close);
    }
    #[cfg(test)]
    pub(crate) fn ops(&self) -> &[PathOp] {
        &self.ops
    }

    /// Closed polygons approximating each subpath.
    pub(crate) fn flatten(&self) -> Vec<Vec<Vec2>> {
        let mut polys = Vec::new();
        let mut cur: Vec<Vec2> = Vec::new();
        for op in &self.ops {
            match *op {
                PathOp::MoveTo(p) => {
                    if cur.len() >= 3 {
                        polys.push(std::mem::take(&mut cur));
                    }
                    cur.clear();
                    cur.push(p);
                }
                PathOp::QuadTo { ctrl, to } => {
                    let Some(&from) = cur.last() else {
                        cur.push(to);
                        continue;
                    };
                    for s in 1..=CURVE_STEPS {
                        let t = s as f32 / CURVE_STEPS as f32;
                        let u = 1.0 - t;
                        cur.push(from.mul(u * u).add(ctrl.mul(2.0 * u * t)).add(to.mul(t * t)));
                    }
                }
                PathOp::Close => {
                    if cur.len() >= 3 {
                        polys.push(std::mem::take(&mut cur));
                    }
                    cur.clear();
                }
            }
        }
        if cur.len() >= 3 {
            polys.push(cur);
        }
        polys
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ColorStop {
    pub(crate) offset: f32,
    pub(crate) color: Rgba,
}

/// Concentric radial gradient from `r0` to `r1` around `center`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RadialGradient {
    pub(crate) center: Vec2,
    pub(crate) r0: f32,
    pub(crate) r1: f32,
    pub(crate) stops: Vec<ColorStop>,
}

impl RadialGradient {
    pub(crate) fn new(center: Vec2, r0: f32, r1: f32) -> Self {
        Self {
            center,
            r0,
            r1,
            stops: Vec::new(),
        }
    }

    pub(crate) fn add_stop(&mut self, offset: f32, color: Rgba) {
        let offset = offset.clamp(0.0, 1.0);
        let at = self.stops.partition_point(|s| s.offset <= offset);
        self.stops.insert(at, ColorStop { offset, color });
    }

    pub(crate) fn color_at(&self, p: Vec2) -> Rgba {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Rgba {
                r: 0,
                g: 0,
                b: 0,
                a: 0.0,
            };
        };
        let span = self.r1 - self.r0;
        let t = if span > 0.0 {
            ((self.center.dist(p) - self.r0) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let k = if b.offset > a.offset {
                    (t - a.offset) / (b.offset - a.offset)
                } else {
                    1.0
                };
                let ch = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * k).round() as u8;
                return Rgba {
                    r: ch(a.color.r, b.color.r),
                    g: ch(a.color.g, b.color.g),
                    b: ch(a.color.b, b.color.b),
                    a: a.color.a + (b.color.a - a.color.a) * k,
                };
            }
        }
        last.color
    }
}

/// A 2D drawing target in world-pixel coordinates.
pub(crate) trait Surface {
    fn resize(&mut self, viewport: Viewport);
    fn clear(&mut self);
    /// Fills issued while a filter is set are filtered together; setting
    /// `Filter::None` flushes them.
    fn set_filter(&mut self, filter: Filter);
    fn fill(&mut self, path: &Path, paint: &RadialGradient);
}

/// Premultiplied RGBA, channels 0.0-1.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Pixel {
    pub(crate) r: f32,
    pub(crate) g: f32,
    pub(crate) b: f32,
    pub(crate) a: f32,
}

impl Pixel {
    fn from_rgba(c: Rgba) -> Self {
        let a = c.a.clamp(0.0, 1.0);
        Self {
            r: c.r as f32 / 255.0 * a,
            g: c.g as f32 / 255.0 * a,
            b: c.b as f32 / 255.0 * a,
            a,
        }
    }

    fn over(self, dst: Pixel) -> Pixel {
        let k = 1.0 - self.a;
        Pixel {
            r: self.r + dst.r * k,
            g: self.g + dst.g * k,
            b: self.b + dst.b * k,
            a: self.a + dst.a * k,
        }
    }
}

/// Software raster surface. Each canvas pixel covers `scale` world pixels.
pub(crate) struct PixelCanvas {
    w: u32,
    h: u32,
    scale: (f32, f32),
    px: Vec<Pixel>,
    layer: Option<(Filter, Vec<Pixel>)>,
    scratch: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(viewport: Viewport, scale: (f32, f32)) -> Self {
        let scale = (scale.0.max(1e-3), scale.1.max(1e-3));
        let mut c = Self {
            w: 0,
            h: 0,
            scale,
            px: Vec::new(),
            layer: None,
            scratch: Vec::new(),
        };
        c.resize(viewport);
        c
    }

    pub(crate) fn width(&self) -> u32 {
        self.w
    }
    pub(crate) fn height(&self) -> u32 {
        self.h
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub(crate) fn pixel(&self, x: u32, y: u32) -> Pixel {
        if x >= self.w || y >= self.h {
            return Pixel::default();
        }
        self.px[self.idx(x, y)]
    }

    fn flush_layer(&mut self) {
        let Some((filter, mut layer)) = self.layer.take() else {
            return;
        };
        if let Filter::BlurContrast { blur_px, contrast } = filter {
            self.scratch.resize(layer.len(), Pixel::default());
            let (w, h) = (self.w as usize, self.h as usize);
            let rx = blur_radii(blur_px / self.scale.0);
            let ry = blur_radii(blur_px / self.scale.1);
            for (&rx, &ry) in rx.iter().zip(&ry) {
                box_blur_h(&layer, &mut self.scratch, w, h, rx);
                box_blur_v(&self.scratch, &mut layer, w, h, ry);
            }
            for p in &mut layer {
                apply_contrast(p, contrast);
            }
        }
        for (dst, src) in self.px.iter_mut().zip(&layer) {
            *dst = src.over(*dst);
        }
    }
}

impl Surface for PixelCanvas {
    fn resize(&mut self, viewport: Viewport) {
        let w = (viewport.w / self.scale.0).round().max(0.0) as u32;
        let h = (viewport.h / self.scale.1).round().max(0.0) as u32;
        if w == self.w && h == self.h && !self.px.is_empty() {
            return;
        }
        self.w = w;
        self.h = h;
        self.px = vec![Pixel::default(); w as usize * h as usize];
        self.layer = None;
    }

    fn clear(&mut self) {
        self.px.fill(Pixel::default());
        self.layer = None;
    }

    fn set_filter(&mut self, filter: Filter) {
        self.flush_layer();
        if filter != Filter::None {
            self.layer = Some((filter, vec![Pixel::default(); self.px.len()]));
        }
    }

    fn fill(&mut self, path: &Path, paint: &RadialGradient) {
        let (sx, sy) = self.scale;
        let polys: Vec<Vec<Vec2>> = path
            .flatten()
            .into_iter()
            .map(|poly| poly.into_iter().map(|p| Vec2::new(p.x / sx, p.y / sy)).collect())
            .collect();
        let (w, h) = (self.w, self.h);
        let target = match self.layer.as_mut() {
            Some((_, layer)) => layer,
            None => &mut self.px,
        };

        let mut crossings: Vec<(f32, i32)> = Vec::new();
        for y in 0..h {
            let cy = y as f32 + 0.5;
            crossings.clear();
            for poly in &polys {
                for (i, &a) in poly.iter().enumerate() {
                    let b = poly[(i + 1) % poly.len()];
                    if (a.y <= cy) == (b.y <= cy) {
                        continue;
                    }
                    let x = a.x + (cy - a.y) / (b.y - a.y) * (b.x - a.x);
                    crossings.push((x, if b.y > a.y { 1 } else { -1 }));
                }
            }
            if crossings.is_empty() {
                continue;
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            // non-zero winding
            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding == 0 {
                    continue;
                }
                let x0 = (pair[0].0 - 0.5).ceil().max(0.0) as u32;
                let x1 = ((pair[1].0 - 0.5).ceil().max(0.0) as u32).min(w);
                for x in x0..x1 {
                    let world = Vec2::new((x as f32 + 0.5) * sx, cy * sy);
                    let src = Pixel::from_rgba(paint.color_at(world));
                    let i = (y as usize) * (w as usize) + (x as usize);
                    target[i] = src.over(target[i]);
                }
            }
        }
    }
}

/// Box radii for three passes approximating a Gaussian of `sigma` pixels.
fn blur_radii(sigma: f32) -> [usize; 3] {
    if sigma.is_nan() || sigma <= 0.0 {
        return [0; 3];
    }
    let ideal = (4.0 * sigma * sigma + 1.0).sqrt();
    let r = ((ideal - 1.0) * 0.5).round().max(0.0) as usize;
    [r; 3]
}

fn box_blur_h(src: &[Pixel], dst: &mut [Pixel], w: usize, h: usize, r: usize) {
    if r == 0 {
        dst.copy_from_slice(src);
        return;
    }
    let norm = 1.0 / (2 * r + 1) as f32;
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        let out = &mut dst[y * w..(y + 1) * w];
        running_box(row.len(), r, norm, |i| row[i], |i, p| out[i] = p);
    }
}

fn box_blur_v(src: &[Pixel], dst: &mut [Pixel], w: usize, h: usize, r: usize) {
    if r == 0 {
        dst.copy_from_slice(src);
        return;
    }
    let norm = 1.0 / (2 * r + 1) as f32;
    for x in 0..w {
        running_box(h, r, norm, |i| src[i * w + x], |i, p| dst[i * w + x] = p);
    }
}

/// Sliding-window mean over `n` samples; outside the range is transparent.
fn running_box(
    n: usize,
    r: usize,
    norm: f32,
    get: impl Fn(usize) -> Pixel,
    mut put: impl FnMut(usize, Pixel),
) {
    let mut acc = Pixel::default();
    let add = |acc: &mut Pixel, p: Pixel, s: f32| {
        acc.r += p.r * s;
        acc.g += p.g * s;
        acc.b += p.b * s;
        acc.a += p.a * s;
    };
    for i in 0..r.min(n) {
        add(&mut acc, get(i), 1.0);
    }
    for i in 0..n {
        if i + r < n {
            add(&mut acc, get(i + r), 1.0);
        }
        put(
            i,
            Pixel {
                r: (acc.r * norm).max(0.0),
                g: (acc.g * norm).max(0.0),
                b: (acc.b * norm).max(0.0),
                a: (acc.a * norm).clamp(0.0, 1.0),
            },
        );
        if i >= r {
            add(&mut acc, get(i - r), -1.0);
        }
    }
}

/// CSS-style contrast on the unpremultiplied colour; alpha is untouched.
fn apply_contrast(p: &mut Pixel, k: f32) {
    if p.a <= 1e-6 {
        *p = Pixel::default();
        return;
    }
    let f = |c: f32| (((c / p.a) - 0.5) * k + 0.5).clamp(0.0, 1.0) * p.a;
    *p = Pixel {
        r: f(p.r),
        g: f(p.g),
        b: f(p.b),
        a: p.a,
    };
}
