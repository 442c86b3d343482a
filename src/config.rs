use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::audio::bands::BandMode;
use crate::error::AnalysisError;
use crate::visual::palette::ColorScheme;
use crate::visual::scene::RenderMode;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Everything the analysis core depends on besides its input buffers.
///
/// Quality changes produce a new value instead of mutating a shared analyser,
/// so each tick is a function of (input, config).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Detector threshold bias. 1.0 keeps the stock ratios, higher fires more often.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// Time constant of the analyser node's magnitude smoothing (0.0-1.0)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
    #[serde(default)]
    pub band_mode: BandMode,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub mode: RenderMode,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_max_particles")]
    pub max_particles: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            smoothing: default_smoothing(),
            fft_size: default_fft_size(),
            min_db: default_min_db(),
            max_db: default_max_db(),
            band_mode: BandMode::default(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            color_scheme: ColorScheme::default(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            max_particles: default_max_particles(),
            seed: default_seed(),
        }
    }
}

fn default_sensitivity() -> f32 { 1.0 }
fn default_smoothing() -> f32 { 0.8 }
fn default_fft_size() -> usize { 2048 }
fn default_min_db() -> f32 { -100.0 }
fn default_max_db() -> f32 { -30.0 }
fn default_sample_rate() -> u32 { 44100 }
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_fps() -> u32 { 60 }
fn default_max_particles() -> usize { 400 }
fn default_seed() -> u64 { 7 }

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(32..=32768).contains(&self.fft_size) || !self.fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "fft_size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(self.sensitivity > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "sensitivity must be positive, got {}",
                self.sensitivity
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(AnalysisError::InvalidConfig(format!(
                "smoothing must be in [0, 1), got {}",
                self.smoothing
            )));
        }
        if self.min_db >= self.max_db {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_db ({}) must be below max_db ({})",
                self.min_db, self.max_db
            )));
        }
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig("sample_rate must be non-zero".into()));
        }
        Ok(())
    }

    /// Number of frequency bins the analyser emits per tick.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Applies the sensitivity bias to a detector trigger ratio.
    ///
    /// Only the part of the ratio above 1.0 is scaled, so a ratio never drops
    /// to or below parity with the running average.
    pub fn biased_ratio(&self, ratio: f32) -> f32 {
        1.0 + (ratio - 1.0) / self.sensitivity
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    config
        .analysis
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Explicit path first, then `./beatscope.toml`, then the per-user config dirs.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("beatscope.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("beatscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("beatscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bin_count(), 1024);
    }

    #[test]
    fn rejects_bad_fft_size() {
        let config = AnalysisConfig {
            fft_size: 1000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_db_range() {
        let config = AnalysisConfig {
            min_db: -20.0,
            max_db: -30.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sensitivity_scales_ratio_above_parity() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.biased_ratio(1.4), 1.4);
        config.sensitivity = 2.0;
        assert!((config.biased_ratio(1.4) - 1.2).abs() < 1e-6);
        config.sensitivity = 0.5;
        assert!((config.biased_ratio(1.4) - 1.8).abs() < 1e-6);
    }

    #[test]
    fn loads_partial_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[analysis]\nsensitivity = 1.5\nband_mode = \"fraction\"\n\n[render]\nmode = \"circular\"\ncolor_scheme = \"neon\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analysis.sensitivity, 1.5);
        assert_eq!(config.analysis.band_mode, BandMode::BinFraction);
        assert_eq!(config.analysis.fft_size, 2048);
        assert_eq!(config.render.mode, RenderMode::Circular);
        assert_eq!(config.render.color_scheme, ColorScheme::Neon);
        assert_eq!(config.render.fps, 60);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nsmoothing = 1.5").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = PathBuf::from("/tmp/some/where.toml");
        assert_eq!(find_config_path(Some(&path)), Some(path));
    }
}
