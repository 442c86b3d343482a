use serde::Serialize;

/// Per-tick spectral and temporal features.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Tick timestamp in milliseconds
    pub timestamp_ms: f64,
    /// RMS of the full magnitude spectrum
    pub energy: f32,
    /// Band energies (RMS over each band's bins)
    pub sub_bass: f32,
    pub bass: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub presence: f32,
    pub brilliance: f32,
    pub treble: f32,
    /// Magnitude-weighted mean bin index over bin count (0.0-1.0)
    pub spectral_centroid: f32,
    /// Fraction of bins holding 85% of the spectral energy (0.0-1.0)
    pub spectral_rolloff: f32,
    /// Sum of positive bin increases since the previous tick
    pub spectral_flux: f32,
    /// Fraction of adjacent time samples changing sign (0.0-1.0)
    pub zero_crossing_rate: f32,
    /// A-weighted spectral RMS
    pub loudness: f32,
    /// Crest factor of the time buffer in dB
    pub dynamic_range: f32,
    pub harmonic_content: f32,
    pub percussive_content: f32,
    pub onset: bool,
    pub transient: bool,
    /// Set when the tick was short-circuited as silence
    pub silent: bool,
}

impl FeatureVector {
    pub fn silent(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            silent: true,
            ..Self::default()
        }
    }
}

/// Event flags from one detector tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BeatResult {
    pub timestamp_ms: f64,
    pub beat: bool,
    pub kick: bool,
    pub snare: bool,
    pub hihat: bool,
    /// How far the beat cleared its threshold (0.0-1.0), 0 without a beat
    pub confidence: f32,
    pub energy: f32,
    pub bass_energy: f32,
}

impl BeatResult {
    pub fn quiet(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.beat || self.kick || self.snare || self.hihat
    }
}

/// Everything the core produced for one tick, as handed to the renderer.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TickSnapshot {
    pub features: FeatureVector,
    pub beat: BeatResult,
    /// Smoothed tempo in BPM, 0 until enough beats were seen
    pub tempo_bpm: f32,
    pub tempo_confidence: f32,
    pub rhythm_strength: f32,
}
