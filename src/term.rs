use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};

use crate::geom::{Vec2, Viewport};
use crate::palette::{Rgb, Theme};
use crate::sim::{FrameHandle, Host, Subscription};
use crate::surface::{PixelCanvas, Pixel};

/// Braille: 2×4 dots per cell.
const DOTS_X: u32 = 2;
const DOTS_Y: u32 = 4;
/// Dots fainter than this stay unlit.
const INK_ALPHA: f32 = 0.05;

fn braille_bit(dx: u32, dy: u32) -> u8 {
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
    pub(crate) bg: Rgb,
}

impl Cell {
    fn blank(bg: Rgb) -> Self {
        Self { ch: ' ', fg: bg, bg }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        let black = Rgb { r: 0, g: 0, b: 0 };
        Self {
            w,
            h,
            cells: vec![Cell::blank(black); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
}

/// Backdrop dot over the theme background at layer `opacity`.
fn composite(p: Pixel, bg: Rgb, opacity: f32) -> Rgb {
    let k = 1.0 - p.a * opacity;
    let ch = |src: f32, dst: u8| -> u8 {
        (src * opacity * 255.0 + dst as f32 * k).round().clamp(0.0, 255.0) as u8
    };
    Rgb {
        r: ch(p.r, bg.r),
        g: ch(p.g, bg.g),
        b: ch(p.b, bg.b),
    }
}

/// Cell tint is the mean of all eight dots; lit dots get their own mean as ink.
/// The canvas is sampled proportionally, so it covers the whole grid even
/// when its resolution lags behind the terminal.
pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, bg: Rgb, opacity: f32) {
    let grid_w = (out.w as u64 * DOTS_X as u64).max(1);
    let grid_h = (out.h as u64 * DOTS_Y as u64).max(1);
    let sample_x = |gx: u32| (gx as u64 * canvas.width() as u64 / grid_w) as u32;
    let sample_y = |gy: u32| (gy as u64 * canvas.height() as u64 / grid_h) as u32;
    for cy in 0..out.h {
        for cx in 0..out.w {
            let mut mask = 0u8;
            let mut all = [0u32; 3];
            let mut ink = [0u32; 3];
            let mut ink_count = 0u32;

            for dy in 0..DOTS_Y {
                for dx in 0..DOTS_X {
                    let p = canvas.pixel(
                        sample_x(cx as u32 * DOTS_X + dx),
                        sample_y(cy as u32 * DOTS_Y + dy),
                    );
                    let c = composite(p, bg, opacity);
                    all[0] += c.r as u32;
                    all[1] += c.g as u32;
                    all[2] += c.b as u32;
                    if p.a >= INK_ALPHA {
                        mask |= braille_bit(dx, dy);
                        ink[0] += c.r as u32;
                        ink[1] += c.g as u32;
                        ink[2] += c.b as u32;
                        ink_count += 1;
                    }
                }
            }

            let n = DOTS_X * DOTS_Y;
            let tint = Rgb {
                r: (all[0] / n) as u8,
                g: (all[1] / n) as u8,
                b: (all[2] / n) as u8,
            };
            let cell = if ink_count == 0 {
                Cell::blank(tint)
            } else {
                Cell {
                    ch: char::from_u32(0x2800 + mask as u32).unwrap_or(' '),
                    fg: Rgb {
                        r: (ink[0] / ink_count) as u8,
                        g: (ink[1] / ink_count) as u8,
                        b: (ink[2] / ink_count) as u8,
                    },
                    bg: tint,
                }
            };
            out.set(cx, cy, cell);
        }
    }
}

/// Text drawn over the backdrop; the backdrop never covers it.
pub(crate) fn draw_text(out: &mut CellBuffer, x: u16, y: u16, text: &str, fg: Rgb, bg: Rgb) {
    for (i, ch) in text.chars().enumerate() {
        let Ok(dx) = u16::try_from(i) else { break };
        let Some(cx) = x.checked_add(dx) else { break };
        if cx >= out.w {
            break;
        }
        out.set(cx, y, Cell { ch, fg, bg });
    }
}

fn to_color(c: Rgb) -> Color {
    Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

/// Alternate screen + raw mode for as long as it lives.
struct TermGuard {
    out: Stdout,
}

impl TermGuard {
    fn new() -> io::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            cursor::Hide,
            Clear(ClearType::All)
        ) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self { out })
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            EndSynchronizedUpdate,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct HostConfig {
    pub(crate) reduced_motion: bool,
    /// World units per terminal cell. Fixed for the session, so font zoom
    /// never changes the canvas scale.
    pub(crate) cell_px: (f32, f32),
    pub(crate) fps_cap: u32,
    pub(crate) opacity: f32,
}

pub(crate) struct TerminalHost {
    cfg: HostConfig,
    guard: Option<TermGuard>,
    cols: u16,
    rows: u16,
    cell_px: (f32, f32),
    prev: CellBuffer,
    cur: CellBuffer,
    full_redraw: bool,
    hud: Option<String>,
    budget: Duration,
    next_id: u64,
    pending: Option<FrameHandle>,
    frame_started: Instant,
    due: Instant,
}

impl TerminalHost {
    /// Reads the terminal size but leaves the terminal untouched.
    pub(crate) fn new(cfg: HostConfig) -> Self {
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        let fps = cfg.fps_cap.clamp(5, 240);
        let now = Instant::now();
        Self {
            cfg,
            guard: None,
            cols,
            rows,
            cell_px: (cfg.cell_px.0.max(1.0), cfg.cell_px.1.max(1.0)),
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
            full_redraw: true,
            hud: None,
            budget: Duration::from_secs_f32(1.0 / fps as f32),
            next_id: 0,
            pending: None,
            frame_started: now,
            due: now,
        }
    }

    pub(crate) fn set_hud(&mut self, line: Option<String>) {
        self.hud = line;
    }

    /// Records the new terminal size; returns the matching viewport.
    pub(crate) fn on_resize(&mut self, cols: u16, rows: u16) -> Viewport {
        self.cols = cols;
        self.rows = rows;
        self.viewport()
    }

    /// World units covered by one braille dot.
    fn dot_scale(&self) -> (f32, f32) {
        (
            self.cell_px.0 / DOTS_X as f32,
            self.cell_px.1 / DOTS_Y as f32,
        )
    }

    /// Pointer cell to normalized viewport coordinates.
    pub(crate) fn normalize(&self, col: u16, row: u16) -> Vec2 {
        Vec2::new(
            (col as f32 + 0.5) / self.cols.max(1) as f32,
            (row as f32 + 0.5) / self.rows.max(1) as f32,
        )
    }

    /// How long the loop may wait for input before the next frame is due.
    pub(crate) fn wait_budget(&self, now: Instant) -> Duration {
        match self.pending {
            Some(_) => self.due.saturating_duration_since(now),
            None => self.budget,
        }
    }

    /// Hands out the pending frame once its slot has come.
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<FrameHandle> {
        if self.pending.is_none() || now < self.due {
            return None;
        }
        self.frame_started = now;
        self.pending.take()
    }

    fn sync_size(&mut self) {
        if self.cur.w != self.cols || self.cur.h != self.rows {
            self.prev = CellBuffer::new(self.cols, self.rows);
            self.cur = CellBuffer::new(self.cols, self.rows);
            self.full_redraw = true;
        }
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        let Some(guard) = self.guard.as_mut() else {
            return Ok(());
        };
        let out = &mut guard.out;
        queue!(out, BeginSynchronizedUpdate)?;
        if self.full_redraw {
            queue!(out, Clear(ClearType::All))?;
        }

        let mut last_fg = None;
        let mut last_bg = None;
        for y in 0..self.cur.h {
            for x in 0..self.cur.w {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if !self.full_redraw && c == self.prev.cells[i] {
                    continue;
                }
                queue!(out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(out, SetForegroundColor(to_color(c.fg)))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(out, SetBackgroundColor(to_color(c.bg)))?;
                    last_bg = Some(c.bg);
                }
                queue!(out, Print(c.ch))?;
            }
        }
        queue!(out, ResetColor, EndSynchronizedUpdate)?;
        out.flush().context("flushing terminal")?;

        self.prev.cells.copy_from_slice(&self.cur.cells);
        self.full_redraw = false;
        Ok(())
    }
}

impl Host for TerminalHost {
    type Surface = PixelCanvas;

    fn prefers_reduced_motion(&self) -> bool {
        self.cfg.reduced_motion
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(
            self.cols as f32 * self.cell_px.0,
            self.rows as f32 * self.cell_px.1,
        )
    }

    fn create_surface(&mut self, viewport: Viewport) -> Option<PixelCanvas> {
        if self.guard.is_none() {
            self.guard = Some(TermGuard::new().ok()?);
            self.full_redraw = true;
        }
        Some(PixelCanvas::new(viewport, self.dot_scale()))
    }

    fn subscribe(&mut self) -> anyhow::Result<Subscription> {
        execute!(io::stdout(), EnableMouseCapture).context("enabling mouse capture")?;
        Ok(Subscription::new(|| {
            let _ = execute!(io::stdout(), DisableMouseCapture);
        }))
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let h = FrameHandle(self.next_id);
        self.pending = Some(h);
        self.due = self.frame_started + self.budget;
        h
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn present(&mut self, surface: &PixelCanvas, theme: Theme) -> anyhow::Result<()> {
        self.sync_size();
        let bg = theme.background();
        canvas_to_cells(surface, &mut self.cur, bg, self.cfg.opacity);
        if let Some(line) = &self.hud {
            let fg = theme.hud_fg();
            let strip = Rgb::lerp(bg, fg, 0.08);
            for x in 0..self.cur.w {
                self.cur.set(x, 0, Cell::blank(strip));
            }
            draw_text(&mut self.cur, 1, 0, line, fg, strip);
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Path, RadialGradient, Surface};
    use crate::palette::Rgba;

    fn host() -> TerminalHost {
        let mut h = TerminalHost::new(HostConfig {
            reduced_motion: false,
            cell_px: (8.0, 16.0),
            fps_cap: 50,
            opacity: 0.9,
        });
        h.cols = 10;
        h.rows = 4;
        h
    }

    #[test]
    fn transparent_dots_show_background() {
        let bg = Rgb { r: 9, g: 9, b: 14 };
        assert_eq!(composite(Pixel::default(), bg, 0.9), bg);
    }

    #[test]
    fn layer_opacity_lets_background_through() {
        let white = Pixel {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
        };
        let c = composite(white, Rgb { r: 0, g: 0, b: 0 }, 0.8);
        assert_eq!(c, Rgb { r: 204, g: 204, b: 204 });
    }

    #[test]
    fn filled_area_lights_braille_dots() {
        let mut canvas = PixelCanvas::new(Viewport::new(16.0, 16.0), (4.0, 4.0));
        let mut path = Path::default();
        let corners = [
            Vec2::new(0.0, 0.0),
            Vec2::new(8.0, 0.0),
            Vec2::new(8.0, 16.0),
            Vec2::new(0.0, 16.0),
        ];
        path.move_to(corners[0]);
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            path.quad_to(a.midpoint(b), b);
        }
        path.close();
        let mut g = RadialGradient::new(Vec2::ZERO, 0.0, 1.0);
        g.add_stop(0.0, Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        canvas.fill(&path, &g);

        let mut cells = CellBuffer::new(2, 1);
        let bg = Rgb { r: 0, g: 0, b: 0 };
        canvas_to_cells(&canvas, &mut cells, bg, 1.0);

        let lit = cells.get(0, 0).unwrap();
        assert_eq!(lit.ch, '\u{28FF}');
        assert_eq!(lit.fg, Rgb { r: 255, g: 0, b: 0 });
        let empty = cells.get(1, 0).unwrap();
        assert_eq!(empty, Cell::blank(bg));
    }

    #[test]
    fn resized_canvas_matches_the_dot_grid() {
        let mut h = host();
        let mut canvas = PixelCanvas::new(h.viewport(), h.dot_scale());
        assert_eq!((canvas.width(), canvas.height()), (20, 16));

        let vp = h.on_resize(40, 12);
        canvas.resize(vp);
        assert_eq!((canvas.width(), canvas.height()), (80, 48));
    }

    #[test]
    fn coarse_canvas_still_covers_every_cell() {
        // 40x12 cells need 80x48 dots; this canvas has 160x96
        let mut canvas = PixelCanvas::new(Viewport::new(640.0, 384.0), (4.0, 4.0));
        let mut path = Path::default();
        let corners = [
            Vec2::new(320.0, 192.0),
            Vec2::new(640.0, 192.0),
            Vec2::new(640.0, 384.0),
            Vec2::new(320.0, 384.0),
        ];
        path.move_to(corners[0]);
        for i in 0..4 {
            let (a, b) = (corners[i], corners[(i + 1) % 4]);
            path.quad_to(a.midpoint(b), b);
        }
        path.close();
        let mut g = RadialGradient::new(Vec2::ZERO, 0.0, 1.0);
        g.add_stop(0.0, Rgba { r: 0, g: 255, b: 0, a: 1.0 });
        canvas.fill(&path, &g);

        let mut cells = CellBuffer::new(40, 12);
        let bg = Rgb { r: 0, g: 0, b: 0 };
        canvas_to_cells(&canvas, &mut cells, bg, 1.0);

        let lit = cells.cells.iter().filter(|c| c.ch != ' ').count();
        assert_eq!(lit, 20 * 6);
        assert_eq!(cells.get(30, 9).unwrap().ch, '\u{28FF}');
        assert_eq!(cells.get(39, 11).unwrap().ch, '\u{28FF}');
        assert_eq!(cells.get(5, 2).unwrap(), Cell::blank(bg));
    }

    #[test]
    fn text_is_clipped_to_the_row() {
        let mut cells = CellBuffer::new(4, 1);
        let (fg, bg) = (Rgb { r: 1, g: 2, b: 3 }, Rgb { r: 0, g: 0, b: 0 });
        draw_text(&mut cells, 1, 0, "hello", fg, bg);
        let row: String = cells.cells.iter().map(|c| c.ch).collect();
        assert_eq!(row, " hel");
    }

    #[test]
    fn frames_wait_for_their_slot() {
        let mut h = host();
        let start = h.frame_started;
        let f = h.request_frame();
        assert_eq!(h.take_due(start), None);
        assert_eq!(h.take_due(start + Duration::from_millis(25)), Some(f));
        assert_eq!(h.take_due(start + Duration::from_millis(60)), None);
    }

    #[test]
    fn cancelled_frame_never_comes_due() {
        let mut h = host();
        let start = h.frame_started;
        let f = h.request_frame();
        h.cancel_frame(f);
        assert_eq!(h.take_due(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn pointer_cells_normalize_to_centres() {
        let h = host();
        assert_eq!(h.normalize(0, 0), Vec2::new(0.05, 0.125));
        assert_eq!(h.normalize(9, 3), Vec2::new(0.95, 0.875));
    }
}
