use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub(crate) fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    /// What the backdrop is composited over.
    pub(crate) fn background(self) -> Rgb {
        match self {
            Theme::Dark => Rgb { r: 9, g: 9, b: 14 },
            Theme::Light => Rgb { r: 246, g: 246, b: 250 },
        }
    }

    pub(crate) fn hud_fg(self) -> Rgb {
        match self {
            Theme::Dark => Rgb { r: 210, g: 215, b: 235 },
            Theme::Light => Rgb { r: 40, g: 40, b: 60 },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

impl Rgb {
    pub(crate) fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp1 = |x: u8, y: u8| -> u8 {
            (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8
        };
        Rgb {
            r: lerp1(a.r, b.r),
            g: lerp1(a.g, b.g),
            b: lerp1(a.b, b.b),
        }
    }
}

/// Channels 0-255, alpha 0.0-1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Rgba {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: f32,
}

impl Rgba {
    pub(crate) fn with_alpha(self, a: f32) -> Rgba {
        Rgba { a, ..self }
    }
}

/// Where a blob starts and how it is tinted.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlobSeed {
    /// Start position as a fraction of the viewport.
    pub(crate) at: (f32, f32),
    pub(crate) radius: f32,
    pub(crate) rgb: Rgb,
    pub(crate) alpha_dark: f32,
    pub(crate) alpha_light: f32,
}

impl BlobSeed {
    pub(crate) fn color(&self, theme: Theme) -> Rgba {
        let a = match theme {
            Theme::Dark => self.alpha_dark,
            Theme::Light => self.alpha_light,
        };
        Rgba {
            r: self.rgb.r,
            g: self.rgb.g,
            b: self.rgb.b,
            a,
        }
    }
}

const fn seed(at: (f32, f32), radius: f32, rgb: (u8, u8, u8), dark: f32, light: f32) -> BlobSeed {
    BlobSeed {
        at,
        radius,
        rgb: Rgb {
            r: rgb.0,
            g: rgb.1,
            b: rgb.2,
        },
        alpha_dark: dark,
        alpha_light: light,
    }
}

pub(crate) const SEEDS: [BlobSeed; 7] = [
    seed((0.2, 0.3), 180.0, (139, 92, 246), 0.25, 0.15),
    seed((0.8, 0.4), 200.0, (236, 72, 153), 0.25, 0.15),
    seed((0.5, 0.7), 160.0, (6, 182, 212), 0.25, 0.15),
    seed((0.7, 0.2), 190.0, (168, 85, 247), 0.22, 0.12),
    seed((0.3, 0.8), 150.0, (59, 130, 246), 0.22, 0.12),
    seed((0.6, 0.5), 170.0, (192, 132, 252), 0.2, 0.1),
    seed((0.4, 0.4), 140.0, (14, 165, 233), 0.2, 0.1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_palette_is_more_opaque() {
        for s in &SEEDS {
            let d = s.color(Theme::Dark);
            let l = s.color(Theme::Light);
            assert_eq!((d.r, d.g, d.b), (l.r, l.g, l.b));
            assert!(d.a > l.a);
        }
        assert_eq!(
            SEEDS[1].color(Theme::Dark),
            Rgba {
                r: 236,
                g: 72,
                b: 153,
                a: 0.25
            }
        );
    }

    #[test]
    fn theme_round_trips_through_json() {
        let s = serde_json::to_string(&Theme::Light).unwrap();
        assert_eq!(s, "\"light\"");
        let back: Theme = serde_json::from_str(&s).unwrap();
        assert_eq!(back, Theme::Light);
        assert_eq!(serde_json::from_str::<Theme>("\"dark\"").unwrap(), Theme::Dark);
        assert!(serde_json::from_str::<Theme>("\"sepia\"").is_err());
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}
