//! Per-tick analysis: extract, detect, track, analyze.

use super::beat::BeatDetector;
use super::features::{BeatResult, TickSnapshot};
use super::rhythm::RhythmAnalyzer;
use super::spectral::SpectralExtractor;
use super::tempo::TempoTracker;
use crate::config::AnalysisConfig;
use crate::error::Result;

/// Owns every stateful stage of the analysis core.
///
/// Single-threaded and non-blocking: callers feed one buffer pair per
/// animation tick and may simply stop calling to cancel.
pub struct AudioPipeline {
    config: AnalysisConfig,
    extractor: SpectralExtractor,
    detector: BeatDetector,
    tempo: TempoTracker,
    rhythm: RhythmAnalyzer,
    last: TickSnapshot,
    ticks: u64,
    silent_ticks: u64,
}

impl AudioPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: SpectralExtractor::new(config.clone()),
            detector: BeatDetector::new(config.clone()),
            tempo: TempoTracker::new(),
            rhythm: RhythmAnalyzer::new(),
            last: TickSnapshot::default(),
            ticks: 0,
            silent_ticks: 0,
            config,
        })
    }

    /// Swaps the configuration between ticks; histories are kept.
    pub fn set_config(&mut self, config: AnalysisConfig) -> Result<()> {
        config.validate()?;
        self.extractor.set_config(config.clone());
        self.detector.set_config(config.clone());
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn tick(&mut self, frequency: &[f32], time: &[f32], timestamp_ms: f64) -> Result<TickSnapshot> {
        let features = self.extractor.analyze(frequency, time, timestamp_ms)?;
        self.ticks += 1;

        let beat = if features.silent {
            // Noise floor: skip detectors so nothing fires on it
            self.silent_ticks += 1;
            BeatResult::quiet(timestamp_ms)
        } else {
            let beat = self.detector.process(frequency, timestamp_ms);
            self.tempo.update(&beat);
            self.rhythm.analyze(frequency);
            beat
        };

        if beat.any() {
            log::debug!(
                "{:.0}ms: beat={} kick={} snare={} hihat={} confidence={:.2}",
                timestamp_ms, beat.beat, beat.kick, beat.snare, beat.hihat, beat.confidence
            );
        }

        self.last = TickSnapshot {
            features,
            beat,
            tempo_bpm: self.tempo.tempo(),
            tempo_confidence: self.tempo.confidence(),
            rhythm_strength: self.rhythm.strength(),
        };
        Ok(self.last.clone())
    }

    pub fn last_snapshot(&self) -> &TickSnapshot {
        &self.last
    }

    pub fn current_tempo(&self) -> f32 {
        self.tempo.tempo()
    }

    pub fn tempo_confidence(&self) -> f32 {
        self.tempo.confidence()
    }

    /// Confidence of the most recent beat, kept between beats.
    pub fn beat_confidence(&self) -> f32 {
        self.detector.last_confidence()
    }

    pub fn rhythm_strength(&self) -> f32 {
        self.rhythm.strength()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn silent_ticks(&self) -> u64 {
        self.silent_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    const BINS: usize = 1024;

    fn pipeline() -> AudioPipeline {
        AudioPipeline::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AnalysisConfig {
            sensitivity: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(AudioPipeline::new(config).is_err());
    }

    #[test]
    fn two_seconds_of_silence() {
        let mut p = pipeline();
        let zeros = vec![0.0; BINS];
        for tick in 0..120 {
            let s = p.tick(&zeros, &zeros, tick as f64 * 1000.0 / 60.0).unwrap();
            assert!(!s.beat.any());
            assert!(!s.features.onset && !s.features.transient);
            assert_eq!(s.tempo_bpm, 0.0);
            assert_eq!(s.rhythm_strength, 0.0);
        }
        assert_eq!(p.silent_ticks(), 120);
    }

    #[test]
    fn length_mismatch_propagates() {
        let mut p = pipeline();
        let err = p.tick(&[0.5; 16], &[0.0; 8], 0.0).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { .. }));
        assert_eq!(p.ticks(), 0);
    }

    #[test]
    fn periodic_pulses_lock_tempo_at_120() {
        let mut p = pipeline();
        let quiet = vec![0.05; BINS];
        let loud = vec![0.8; BINS];
        let time = vec![0.0; BINS];

        // 60 ticks per second, a pulse every 30 ticks = 500ms
        for tick in 1..=(60 * 6) {
            let spectrum = if tick % 30 == 0 { &loud } else { &quiet };
            p.tick(spectrum, &time, tick as f64 * 1000.0 / 60.0).unwrap();
        }
        let tempo = p.current_tempo();
        assert!((tempo - 120.0).abs() <= 2.0, "tempo {tempo}");
        assert!(p.beat_confidence() > 0.0);
        assert!(p.rhythm_strength() > 0.0);
    }

    #[test]
    fn config_swap_keeps_running() {
        let mut p = pipeline();
        let spectrum = vec![0.3; BINS];
        p.tick(&spectrum, &spectrum, 0.0).unwrap();

        let smaller = AnalysisConfig {
            fft_size: 1024,
            ..AnalysisConfig::default()
        };
        p.set_config(smaller).unwrap();
        let half = vec![0.3; BINS / 2];
        let s = p.tick(&half, &half, 16.0).unwrap();
        assert!(s.features.energy > 0.0);
        assert_eq!(s.features.spectral_flux, 0.0);
    }
}
