use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Rainbow,
    Neon,
    Fire,
    Ocean,
    Mono,
}

impl ColorScheme {
    /// Color for a position along the visual (0.0-1.0), rotated by `shift`
    /// degrees and lifted by `brightness` (0.0-1.0).
    pub fn color(self, position: f32, shift: f32, brightness: f32) -> Rgba {
        let t = position.clamp(0.0, 1.0);
        let b = brightness.clamp(0.0, 1.0);
        let (hue, saturation, lightness) = match self {
            ColorScheme::Rainbow => (t * 300.0 + shift, 0.85, 0.45 + 0.25 * b),
            ColorScheme::Neon => (280.0 - t * 100.0 + shift * 0.5, 1.0, 0.5 + 0.2 * b),
            ColorScheme::Fire => (t * 50.0 + shift * 0.1, 1.0, 0.35 + 0.35 * b),
            ColorScheme::Ocean => (180.0 + t * 60.0 + shift * 0.25, 0.8, 0.35 + 0.3 * b),
            ColorScheme::Mono => (0.0, 0.0, 0.3 + 0.6 * b),
        };
        hsl_to_rgb(hue, saturation, lightness)
    }

    pub fn background(self) -> Rgba {
        match self {
            ColorScheme::Fire => Rgba::new(12, 4, 2, 255),
            ColorScheme::Ocean => Rgba::new(2, 8, 16, 255),
            _ => Rgba::new(0, 0, 0, 255),
        }
    }
}

/// `hue` in degrees (any range), `saturation` and `lightness` in 0.0-1.0.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgba {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let channel = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba::new(channel(r), channel(g), channel(b), 255)
}
