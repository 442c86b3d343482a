//! Frequency band table and its mapping onto spectrum bins.
//!
//! Two mappings are supported. `Hertz` anchors each band to fixed frequencies
//! using the configured sample rate, so band edges stay put when the FFT size
//! changes. `BinFraction` keeps the legacy behaviour of slicing the spectrum at
//! fixed fractions of its length, which drifts with FFT size and sample rate.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::config::AnalysisConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BandMode {
    #[default]
    Hertz,
    #[serde(rename = "fraction")]
    #[value(name = "fraction")]
    BinFraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    SubBass,
    Bass,
    Mid,
    HighMid,
    Presence,
    Brilliance,
    Treble,
}

pub const NUM_BANDS: usize = 7;

pub const ALL_BANDS: [Band; NUM_BANDS] = [
    Band::SubBass,
    Band::Bass,
    Band::Mid,
    Band::HighMid,
    Band::Presence,
    Band::Brilliance,
    Band::Treble,
];

struct Edges {
    hz: (f32, f32),
    fraction: (f32, f32),
}

const fn edges(low_hz: f32, high_hz: f32, low_frac: f32, high_frac: f32) -> Edges {
    Edges {
        hz: (low_hz, high_hz),
        fraction: (low_frac, high_frac),
    }
}

// Indexed like ALL_BANDS. Treble overlaps presence and brilliance.
const BAND_EDGES: [Edges; NUM_BANDS] = [
    edges(20.0, 60.0, 0.0, 0.008),
    edges(60.0, 250.0, 0.008, 0.04),
    edges(250.0, 2000.0, 0.04, 0.2),
    edges(2000.0, 4000.0, 0.2, 0.4),
    edges(4000.0, 6000.0, 0.4, 0.6),
    edges(6000.0, 20000.0, 0.6, 1.0),
    edges(4000.0, 20000.0, 0.4, 1.0),
];

/// Kick slice: the lowest bins, DC excluded.
const KICK_EDGES: Edges = edges(20.0, 150.0, 0.0, 0.008);

/// Mid-frequency slice used for the snare's noisiness estimate.
const NOISE_EDGES: Edges = edges(250.0, 4000.0, 0.04, 0.4);

impl Band {
    fn index(self) -> usize {
        match self {
            Band::SubBass => 0,
            Band::Bass => 1,
            Band::Mid => 2,
            Band::HighMid => 3,
            Band::Presence => 4,
            Band::Brilliance => 5,
            Band::Treble => 6,
        }
    }
}

/// Bin ranges resolved for one spectrum length.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    bin_count: usize,
    ranges: [Range<usize>; NUM_BANDS],
    kick: Range<usize>,
    noise: Range<usize>,
}

impl BandLayout {
    pub fn resolve(bin_count: usize, config: &AnalysisConfig) -> Self {
        let resolve = |e: &Edges| match config.band_mode {
            BandMode::Hertz => hz_range(e.hz, bin_count, config.sample_rate),
            BandMode::BinFraction => fraction_range(e.fraction, bin_count),
        };

        let ranges = std::array::from_fn(|i| resolve(&BAND_EDGES[i]));

        let mut kick = resolve(&KICK_EDGES);
        kick.start = kick.start.max(1).min(bin_count);
        kick.end = kick.end.max(kick.start + 1).min(bin_count);

        Self {
            bin_count,
            ranges,
            kick,
            noise: resolve(&NOISE_EDGES),
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn range(&self, band: Band) -> Range<usize> {
        self.ranges[band.index()].clone()
    }

    pub fn kick_range(&self) -> Range<usize> {
        self.kick.clone()
    }

    pub fn noise_range(&self) -> Range<usize> {
        self.noise.clone()
    }
}

fn hz_range((low_hz, high_hz): (f32, f32), bin_count: usize, sample_rate: u32) -> Range<usize> {
    if bin_count == 0 || sample_rate == 0 {
        return 0..0;
    }
    // bin_count = fft_size / 2, so each bin spans sample_rate / fft_size Hz
    let bin_width = sample_rate as f32 / (2 * bin_count) as f32;
    let low = ((low_hz / bin_width).floor() as usize).min(bin_count);
    let high = ((high_hz / bin_width).ceil() as usize).min(bin_count);
    low..high.max(low)
}

fn fraction_range((low, high): (f32, f32), bin_count: usize) -> Range<usize> {
    let start = ((low * bin_count as f32).floor() as usize).min(bin_count);
    let end = ((high * bin_count as f32).floor() as usize).min(bin_count);
    start..end.max(start)
}

/// RMS of a slice, 0 when empty.
pub fn rms(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f32>() / values.len() as f32).sqrt()
}

/// RMS over a bin range, clipped to the spectrum.
pub fn range_rms(spectrum: &[f32], range: Range<usize>) -> f32 {
    let end = range.end.min(spectrum.len());
    let start = range.start.min(end);
    rms(&spectrum[start..end])
}

/// Geometric over arithmetic mean of a slice (spectral flatness), in [0, 1].
///
/// Near 1 for noise-like content, near 0 for tonal content.
pub fn flatness(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let arithmetic = values.iter().sum::<f32>() / values.len() as f32;
    if arithmetic <= f32::EPSILON {
        return 0.0;
    }
    let log_mean = values.iter().map(|v| (v + 1e-10).ln()).sum::<f32>() / values.len() as f32;
    (log_mean.exp() / arithmetic).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: BandMode) -> AnalysisConfig {
        AnalysisConfig {
            band_mode: mode,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn hertz_edges_follow_sample_rate() {
        let layout = BandLayout::resolve(1024, &config(BandMode::Hertz));
        // 44.1kHz / 2048 = ~21.5 Hz per bin
        assert_eq!(layout.range(Band::Bass), 2..12);
        assert_eq!(layout.range(Band::Brilliance), 278..929);
    }

    #[test]
    fn hertz_edges_are_stable_across_fft_sizes() {
        let small = BandLayout::resolve(512, &config(BandMode::Hertz));
        let large = BandLayout::resolve(2048, &config(BandMode::Hertz));
        let small_mid = small.range(Band::Mid);
        let large_mid = large.range(Band::Mid);
        // Four times the bins, same frequencies
        assert!((large_mid.start as i64 - small_mid.start as i64 * 4).abs() <= 4);
        assert!((large_mid.end as i64 - small_mid.end as i64 * 4).abs() <= 4);
    }

    #[test]
    fn fraction_edges_scale_with_length() {
        let layout = BandLayout::resolve(1000, &config(BandMode::BinFraction));
        assert_eq!(layout.range(Band::SubBass), 0..8);
        assert_eq!(layout.range(Band::Brilliance), 600..1000);
        assert_eq!(layout.range(Band::Treble), 400..1000);
    }

    #[test]
    fn kick_range_skips_dc() {
        for mode in [BandMode::Hertz, BandMode::BinFraction] {
            for bins in [16, 256, 1024, 4096] {
                let kick = BandLayout::resolve(bins, &config(mode)).kick_range();
                assert!(kick.start >= 1, "{mode:?} {bins}: {kick:?}");
                assert!(kick.end > kick.start, "{mode:?} {bins}: {kick:?}");
            }
        }
    }

    #[test]
    fn ranges_never_exceed_bin_count() {
        let layout = BandLayout::resolve(64, &config(BandMode::Hertz));
        for band in ALL_BANDS {
            assert!(layout.range(band).end <= 64);
        }
    }

    #[test]
    fn flatness_separates_noise_from_tone() {
        let noise = vec![0.5; 32];
        let mut tone = vec![0.0; 32];
        tone[10] = 1.0;
        assert!(flatness(&noise) > 0.99);
        assert!(flatness(&tone) < 0.01);
        assert_eq!(flatness(&[]), 0.0);
    }

    #[test]
    fn range_rms_clips_out_of_bounds() {
        let spectrum = vec![1.0; 4];
        assert_eq!(range_rms(&spectrum, 2..10), 1.0);
        assert_eq!(range_rms(&spectrum, 8..10), 0.0);
    }
}
