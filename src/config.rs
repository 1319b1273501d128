use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::palette::Theme;
use crate::render::LIQUID;
use crate::surface::Filter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ThemeChoice {
    Dark,
    Light,
    /// Follow the terminal background (COLORFGBG).
    Auto,
}

impl ThemeChoice {
    pub(crate) fn resolve(self, colorfgbg: Option<&str>) -> Theme {
        match self {
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Light => Theme::Light,
            ThemeChoice::Auto => theme_from_colorfgbg(colorfgbg),
        }
    }
}

impl From<Theme> for ThemeChoice {
    fn from(t: Theme) -> Self {
        match t {
            Theme::Dark => ThemeChoice::Dark,
            Theme::Light => ThemeChoice::Light,
        }
    }
}

/// `COLORFGBG` is "fg;bg" (sometimes "fg;x;bg"); dark backgrounds are the
/// low ANSI indices except 7, plus 8.
fn theme_from_colorfgbg(v: Option<&str>) -> Theme {
    let bg = v
        .and_then(|s| s.rsplit(';').next())
        .and_then(|s| s.trim().parse::<u8>().ok());
    match bg {
        Some(0..=6 | 8) | None => Theme::Dark,
        Some(_) => Theme::Light,
    }
}

fn truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "reduce"
    )
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) theme: ThemeChoice,
    pub(crate) seed: u64,
    pub(crate) fps_cap: u32,
    pub(crate) cell_width: f32,
    pub(crate) cell_height: f32,
    pub(crate) show_hud: bool,
    pub(crate) blur_px: f32,
    pub(crate) contrast: f32,
    pub(crate) opacity: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let (blur_px, contrast) = match LIQUID {
            Filter::BlurContrast { blur_px, contrast } => (blur_px, contrast),
            Filter::None => (0.0, 1.0),
        };
        Self {
            theme: ThemeChoice::Auto,
            seed: 0xC0FFEE_u64,
            fps_cap: 60,
            cell_width: 12.0,
            cell_height: 24.0,
            show_hud: true,
            blur_px,
            contrast,
            opacity: 0.9,
        }
    }
}

impl Settings {
    pub(crate) fn filter(&self) -> Filter {
        if self.blur_px <= 0.0 && (self.contrast - 1.0).abs() < f32::EPSILON {
            return Filter::None;
        }
        Filter::BlurContrast {
            blur_px: self.blur_px.max(0.0),
            contrast: self.contrast.max(0.0),
        }
    }

    pub(crate) fn apply_args(&mut self, args: &Args) {
        if let Some(t) = args.theme {
            self.theme = t;
        }
        if let Some(s) = args.seed {
            self.seed = s;
        }
        if let Some(f) = args.fps {
            self.fps_cap = f;
        }
        if args.no_hud {
            self.show_hud = false;
        }
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.cell_width = self.cell_width.max(1.0);
        self.cell_height = self.cell_height.max(1.0);
    }
}

#[derive(Parser, Debug, Default)]
#[command(about = "Liquid blob backdrop for the terminal")]
pub(crate) struct Args {
    /// colour theme
    #[arg(long, value_enum)]
    pub(crate) theme: Option<ThemeChoice>,

    /// RNG seed for blob shapes and drift
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// frame rate cap
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// don't animate at all
    #[arg(long)]
    pub(crate) reduced_motion: bool,

    /// hide the status line
    #[arg(long)]
    pub(crate) no_hud: bool,

    /// write logs to this file (filtered by RUST_LOG)
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
}

/// Read once at startup; later changes to the environment are ignored.
pub(crate) fn prefers_reduced_motion(args: &Args, env: impl Fn(&str) -> Option<String>) -> bool {
    args.reduced_motion
        || ["REDUCE_MOTION", "PREFERS_REDUCED_MOTION"]
            .iter()
            .any(|k| env(k).is_some_and(|v| truthy(&v)))
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "liquidblobs", "LiquidBlobs")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir).ok();
    Ok(Paths {
        settings_path: dir.join("settings.json"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        if let Ok(v) = serde_json::from_str::<Settings>(&s) {
            return v;
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
