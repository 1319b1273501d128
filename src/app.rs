use crate::config::{
    load_settings, prefers_reduced_motion, project_paths, save_settings_atomic, Args, Settings,
    ThemeChoice,
};
use crate::palette::Theme;
use crate::sim::Backdrop;
use crate::surface::PixelCanvas;
use crate::term::{HostConfig, TerminalHost};
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use std::{
    fs,
    path::Path,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Only installs a subscriber when a log file is given; stdout belongs to the screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct FpsMeter {
    window_start: Instant,
    frames: u32,
    smoothed: f32,
}

impl FpsMeter {
    fn new(target: u32) -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            smoothed: target as f32,
        }
    }

    fn frame(&mut self, now: Instant) {
        self.frames += 1;
        let window = (now - self.window_start).as_secs_f32();
        if window >= 0.33 {
            let fps = self.frames as f32 / window.max(1e-6);
            self.smoothed = self.smoothed * 0.85 + fps * 0.15;
            self.frames = 0;
            self.window_start = now;
        }
    }
}

/// What an input event asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Quit,
    ToggleTheme,
    ToggleHud,
    /// Pointer or primary touch at a cell.
    Pointer { col: u16, row: u16 },
    Resize { cols: u16, rows: u16 },
}

fn action_for(ev: &Event) -> Option<Action> {
    match ev {
        Event::Key(k) if k.kind == KeyEventKind::Press => match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('t') | KeyCode::Char('T') => Some(Action::ToggleTheme),
            KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::ToggleHud),
            _ => None,
        },
        Event::Mouse(m) => match m.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
                Some(Action::Pointer {
                    col: m.column,
                    row: m.row,
                })
            }
            _ => None,
        },
        &Event::Resize(cols, rows) => Some(Action::Resize { cols, rows }),
        _ => None,
    }
}

struct App {
    settings: Settings,
    theme: Theme,
    theme_changed: bool,
    host: TerminalHost,
    backdrop: Backdrop<PixelCanvas>,
    fps: FpsMeter,
    should_quit: bool,
}

impl App {
    fn hud_line(&self) -> Option<String> {
        if !self.settings.show_hud {
            return None;
        }
        let blobs = self.backdrop.running().map_or(0, |r| r.blobs.len());
        Some(format!(
            "liquid blobs  theme:{}  blobs:{}  {:>3.0} fps   t theme  h hud  q quit",
            self.theme.name(),
            blobs,
            self.fps.smoothed
        ))
    }

    fn handle(&mut self, ev: Event) {
        let Some(action) = action_for(&ev) else {
            return;
        };
        match action {
            Action::Quit => self.should_quit = true,
            Action::ToggleTheme => {
                self.theme = self.theme.toggled();
                self.theme_changed = true;
                self.backdrop.set_theme(&mut self.host, self.theme);
            }
            Action::ToggleHud => self.settings.show_hud = !self.settings.show_hud,
            Action::Pointer { col, row } => {
                let at = self.host.normalize(col, row);
                self.backdrop.on_pointer(at);
            }
            Action::Resize { cols, rows } => {
                let vp = self.host.on_resize(cols, rows);
                debug!(cols, rows, "terminal resized");
                self.backdrop.on_resize(vp);
            }
        }
    }

    fn run(&mut self) -> Result<()> {
        while !self.should_quit {
            // the one place the loop waits: for input or the next frame slot
            let wait = self.host.wait_budget(Instant::now());
            if event::poll(wait)? {
                loop {
                    let ev = event::read()?;
                    self.handle(ev);
                    if self.should_quit || !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
            if self.should_quit {
                break;
            }

            let now = Instant::now();
            if let Some(frame) = self.host.take_due(now) {
                self.fps.frame(now);
                let hud = self.hud_line();
                self.host.set_hud(hud);
                self.backdrop.on_frame(&mut self.host, frame)?;
            }
            if self.backdrop.is_stopped() {
                break;
            }
        }
        Ok(())
    }
}

pub(crate) fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_deref())?;

    let paths = project_paths().ok();
    let stored = paths
        .as_ref()
        .map(|p| load_settings(&p.settings_path))
        .unwrap_or_default();
    let mut settings = stored.clone();
    settings.apply_args(&args);

    let reduced_motion = prefers_reduced_motion(&args, |k| std::env::var(k).ok());
    let colorfgbg = std::env::var("COLORFGBG").ok();
    let theme = settings.theme.resolve(colorfgbg.as_deref());

    let host = TerminalHost::new(HostConfig {
        reduced_motion,
        cell_px: (settings.cell_width, settings.cell_height),
        fps_cap: settings.fps_cap,
        opacity: settings.opacity,
    });
    let backdrop = Backdrop::new(settings.seed, settings.filter());
    let mut app = App {
        fps: FpsMeter::new(settings.fps_cap),
        settings,
        theme,
        theme_changed: false,
        host,
        backdrop,
        should_quit: false,
    };

    app.backdrop.mount(&mut app.host, app.theme);
    if app.backdrop.is_stopped() {
        // declined: nothing was shown, nothing to undo
        return Ok(());
    }

    let result = app.run();
    app.backdrop.unmount(&mut app.host);
    let App {
        theme,
        theme_changed,
        host,
        ..
    } = app;
    drop(host);

    // only the theme toggle persists; CLI overrides stay one-off
    if let (true, Some(p)) = (theme_changed, paths) {
        let saved = Settings {
            theme: ThemeChoice::from(theme),
            ..stored
        };
        if let Err(e) = save_settings_atomic(&p.settings_path, &saved) {
            warn!(error = %e, "could not save settings");
        }
    }
    result
}
