//! Spectral feature extraction from one (frequency, time) buffer pair.

use super::bands::{flatness, range_rms, rms, Band, BandLayout};
use super::features::FeatureVector;
use super::history::History;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// Full-spectrum RMS below which a tick counts as silence.
pub const SILENCE_EPSILON: f32 = 1e-4;

const ROLLOFF_FRACTION: f32 = 0.85;

const FLUX_HISTORY: usize = 10;
const ONSET_RATIO: f32 = 1.5;
/// Mean per-bin flux an onset must exceed, keeps the noise floor quiet
const ONSET_FLOOR: f32 = 0.002;

const TRANSIENT_HISTORY: usize = 10;
const TRANSIENT_RATIO: f32 = 2.0;
const TRANSIENT_FLOOR: f32 = 0.02;

pub struct SpectralExtractor {
    config: AnalysisConfig,
    layout: Option<BandLayout>,
    a_weights: Vec<f32>,
    previous_spectrum: Vec<f32>,
    flux_history: History,
    rms_history: History,
}

impl SpectralExtractor {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            layout: None,
            a_weights: Vec::new(),
            previous_spectrum: Vec::new(),
            flux_history: History::new(FLUX_HISTORY),
            rms_history: History::new(TRANSIENT_HISTORY),
        }
    }

    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
        self.layout = None;
        self.a_weights.clear();
    }

    /// Computes the feature vector for one tick.
    ///
    /// `frequency` holds magnitudes in [0, 1], `time` samples in [-1, 1]; both
    /// must have the same length. Empty or silent input yields a zeroed vector.
    pub fn analyze(
        &mut self,
        frequency: &[f32],
        time: &[f32],
        timestamp_ms: f64,
    ) -> Result<FeatureVector> {
        if frequency.len() != time.len() {
            return Err(AnalysisError::LengthMismatch {
                frequency: frequency.len(),
                time: time.len(),
            });
        }

        let n = frequency.len();
        if n == 0 {
            self.previous_spectrum.clear();
            return Ok(FeatureVector::silent(timestamp_ms));
        }

        let energy = rms(frequency);
        if energy < SILENCE_EPSILON {
            self.remember(frequency);
            return Ok(FeatureVector::silent(timestamp_ms));
        }

        if self.layout.as_ref().map(|l| l.bin_count()) != Some(n) {
            self.layout = Some(BandLayout::resolve(n, &self.config));
            self.a_weights = a_weights(n, self.config.sample_rate);
        }
        let layout = match self.layout.as_ref() {
            Some(layout) => layout,
            None => return Ok(FeatureVector::silent(timestamp_ms)),
        };
        let band = |b: Band| range_rms(frequency, layout.range(b));

        let magnitude_sum: f32 = frequency.iter().sum();

        let spectral_flux = if self.previous_spectrum.len() == n {
            frequency
                .iter()
                .zip(self.previous_spectrum.iter())
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum()
        } else {
            0.0
        };

        let onset_ratio = self.config.biased_ratio(ONSET_RATIO);
        let onset = !self.flux_history.is_empty()
            && spectral_flux > onset_ratio * self.flux_history.mean()
            && spectral_flux / n as f32 > ONSET_FLOOR;
        self.flux_history.push(spectral_flux);

        let time_rms = rms(time);
        let transient = !self.rms_history.is_empty()
            && time_rms > TRANSIENT_RATIO * self.rms_history.mean()
            && time_rms > TRANSIENT_FLOOR;
        self.rms_history.push(time_rms);

        let loudness = (frequency
            .iter()
            .zip(self.a_weights.iter())
            .map(|(m, w)| (m * w) * (m * w))
            .sum::<f32>()
            / n as f32)
            .sqrt();

        let percussive_content = if magnitude_sum + spectral_flux > 0.0 {
            spectral_flux / (magnitude_sum + spectral_flux)
        } else {
            0.0
        };

        let features = FeatureVector {
            timestamp_ms,
            energy,
            sub_bass: band(Band::SubBass),
            bass: band(Band::Bass),
            mid: band(Band::Mid),
            high_mid: band(Band::HighMid),
            presence: band(Band::Presence),
            brilliance: band(Band::Brilliance),
            treble: band(Band::Treble),
            spectral_centroid: centroid(frequency, magnitude_sum),
            spectral_rolloff: rolloff(frequency),
            spectral_flux,
            zero_crossing_rate: zero_crossing_rate(time),
            loudness,
            dynamic_range: crest_factor_db(time, time_rms),
            harmonic_content: 1.0 - flatness(frequency),
            percussive_content,
            onset,
            transient,
            silent: false,
        };

        self.remember(frequency);
        Ok(features)
    }

    fn remember(&mut self, frequency: &[f32]) {
        if self.previous_spectrum.len() != frequency.len() {
            self.previous_spectrum.resize(frequency.len(), 0.0);
        }
        self.previous_spectrum.copy_from_slice(frequency);
    }
}

fn centroid(frequency: &[f32], magnitude_sum: f32) -> f32 {
    if magnitude_sum <= 0.0 {
        return 0.0;
    }
    let weighted: f32 = frequency
        .iter()
        .enumerate()
        .map(|(i, &m)| i as f32 * m)
        .sum();
    weighted / magnitude_sum / frequency.len() as f32
}

fn rolloff(frequency: &[f32]) -> f32 {
    let total: f32 = frequency.iter().map(|m| m * m).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = total * ROLLOFF_FRACTION;
    let mut cumulative = 0.0;
    for (i, m) in frequency.iter().enumerate() {
        cumulative += m * m;
        if cumulative >= target {
            return (i + 1) as f32 / frequency.len() as f32;
        }
    }
    1.0
}

fn zero_crossing_rate(time: &[f32]) -> f32 {
    if time.len() < 2 {
        return 0.0;
    }
    let crossings = time
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (time.len() - 1) as f32
}

fn crest_factor_db(time: &[f32], time_rms: f32) -> f32 {
    if time_rms <= 1e-9 {
        return 0.0;
    }
    let peak = time.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    (20.0 * (peak / time_rms).log10()).max(0.0)
}

/// Linear A-weighting gain per bin, normalised to unity at 1 kHz.
fn a_weights(bin_count: usize, sample_rate: u32) -> Vec<f32> {
    let bin_width = sample_rate as f32 / (2 * bin_count) as f32;
    (0..bin_count)
        .map(|i| a_weight(i as f32 * bin_width))
        .collect()
}

fn a_weight(freq: f32) -> f32 {
    if freq <= 0.0 {
        return 0.0;
    }
    let f2 = freq * freq;
    let numerator = 12194.0f32.powi(2) * f2 * f2;
    let denominator = (f2 + 20.6f32.powi(2))
        * ((f2 + 107.7f32.powi(2)) * (f2 + 737.9f32.powi(2))).sqrt()
        * (f2 + 12194.0f32.powi(2));
    // +2.0 dB puts 1 kHz at 0 dB
    numerator / denominator * 1.258_925
}
