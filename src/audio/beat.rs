//! Adaptive beat detection plus kick, snare and hi-hat detectors.
//!
//! Every detector compares its current value against a short rolling average
//! of its own history and is gated by a refractory interval, so no detector
//! fires twice inside its window. The per-instrument detectors look at
//! different slices of the same spectrum:
//! - kick: lowest bins (DC excluded), gated on an absolute bass floor
//! - snare: mid + high-mid energy scaled by the mid slice's spectral flatness
//! - hi-hat: treble + brilliance energy

use super::bands::{flatness, range_rms, rms, Band, BandLayout};
use super::features::BeatResult;
use super::history::History;
use crate::config::AnalysisConfig;

/// ~1 second of ticks at 43 Hz
const ENERGY_HISTORY: usize = 43;
const BASS_HISTORY: usize = 43;

const BASE_THRESHOLD: f32 = 1.2;
const MAX_VARIANCE_BOOST: f32 = 0.5;
const MIN_BEAT_INTERVAL_MS: f64 = 250.0;

const KICK_HISTORY: usize = 10;
const KICK_RATIO: f32 = 1.4;
const KICK_BASS_FLOOR: f32 = 0.8;
const KICK_INTERVAL_MS: f64 = 200.0;

const SNARE_HISTORY: usize = 8;
const SNARE_RATIO: f32 = 1.6;
const SNARE_INTERVAL_MS: f64 = 180.0;

const HIHAT_HISTORY: usize = 6;
const HIHAT_RATIO: f32 = 1.8;
const HIHAT_INTERVAL_MS: f64 = 120.0;

/// Rolling-average trigger with a refractory window.
#[derive(Clone, Debug)]
struct Trigger {
    history: History,
    ratio: f32,
    min_interval_ms: f64,
    last_fired_ms: Option<f64>,
}

impl Trigger {
    fn new(capacity: usize, ratio: f32, min_interval_ms: f64) -> Self {
        Self {
            history: History::new(capacity),
            ratio,
            min_interval_ms,
            last_fired_ms: None,
        }
    }

    fn ready(&self, timestamp_ms: f64) -> bool {
        self.last_fired_ms
            .map_or(true, |last| timestamp_ms - last >= self.min_interval_ms)
    }

    /// Records `value` and reports whether it cleared `ratio` x its average.
    fn process(&mut self, value: f32, timestamp_ms: f64, config: &AnalysisConfig, gate: bool) -> bool {
        self.history.push(value);
        let threshold = config.biased_ratio(self.ratio) * self.history.mean();
        let fired = gate && self.ready(timestamp_ms) && value > threshold;
        if fired {
            self.last_fired_ms = Some(timestamp_ms);
        }
        fired
    }
}

pub struct BeatDetector {
    config: AnalysisConfig,
    layout: Option<BandLayout>,
    energy_history: History,
    bass_history: History,
    last_beat_ms: Option<f64>,
    last_confidence: f32,
    kick: Trigger,
    snare: Trigger,
    hihat: Trigger,
}

impl BeatDetector {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            layout: None,
            energy_history: History::new(ENERGY_HISTORY),
            bass_history: History::new(BASS_HISTORY),
            last_beat_ms: None,
            last_confidence: 0.0,
            kick: Trigger::new(KICK_HISTORY, KICK_RATIO, KICK_INTERVAL_MS),
            snare: Trigger::new(SNARE_HISTORY, SNARE_RATIO, SNARE_INTERVAL_MS),
            hihat: Trigger::new(HIHAT_HISTORY, HIHAT_RATIO, HIHAT_INTERVAL_MS),
        }
    }

    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
        self.layout = None;
    }

    /// Current adaptive threshold multiplier, before the sensitivity bias.
    pub fn adaptive_threshold(&self) -> f32 {
        BASE_THRESHOLD + (2.0 * self.energy_history.variance()).min(MAX_VARIANCE_BOOST)
    }

    /// Confidence of the most recent beat.
    pub fn last_confidence(&self) -> f32 {
        self.last_confidence
    }

    pub fn average_energy(&self) -> f32 {
        self.energy_history.mean()
    }

    pub fn average_bass(&self) -> f32 {
        self.bass_history.mean()
    }

    pub fn process(&mut self, frequency: &[f32], timestamp_ms: f64) -> BeatResult {
        let n = frequency.len();
        if n == 0 {
            return BeatResult::quiet(timestamp_ms);
        }
        if self.layout.as_ref().map(|l| l.bin_count()) != Some(n) {
            self.layout = Some(BandLayout::resolve(n, &self.config));
        }
        let layout = match self.layout.as_ref() {
            Some(layout) => layout,
            None => return BeatResult::quiet(timestamp_ms),
        };

        let energy = rms(frequency);
        let bass_range = layout.range(Band::SubBass).start.max(1)..layout.range(Band::Bass).end;
        let bass_energy = range_rms(frequency, bass_range);

        self.energy_history.push(energy);
        self.bass_history.push(bass_energy);

        let average = self.energy_history.mean();
        let threshold = self.config.biased_ratio(self.adaptive_threshold());
        let ready = self
            .last_beat_ms
            .map_or(true, |last| timestamp_ms - last >= MIN_BEAT_INTERVAL_MS);

        let beat = ready && average > 0.0 && energy > threshold * average;
        let confidence = if beat {
            ((energy / (average * threshold) - 1.0) * 2.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if beat {
            self.last_beat_ms = Some(timestamp_ms);
            self.last_confidence = confidence;
            log::trace!(
                "beat at {:.0}ms: energy={:.3} avg={:.3} threshold={:.2}",
                timestamp_ms, energy, average, threshold
            );
        }

        let kick_energy = range_rms(frequency, layout.kick_range());
        let snare_value = {
            let noise_range = layout.noise_range();
            let end = noise_range.end.min(n);
            let start = noise_range.start.min(end);
            let noisiness = flatness(&frequency[start..end]);
            (range_rms(frequency, layout.range(Band::Mid))
                + range_rms(frequency, layout.range(Band::HighMid)))
                * noisiness
        };
        let hihat_value = range_rms(frequency, layout.range(Band::Treble))
            + range_rms(frequency, layout.range(Band::Brilliance));

        let kick = self.kick.process(
            kick_energy,
            timestamp_ms,
            &self.config,
            bass_energy > KICK_BASS_FLOOR,
        );
        let snare = self.snare.process(snare_value, timestamp_ms, &self.config, true);
        let hihat = self.hihat.process(hihat_value, timestamp_ms, &self.config, true);

        BeatResult {
            timestamp_ms,
            beat,
            kick,
            snare,
            hihat,
            confidence,
            energy,
            bass_energy,
        }
    }
}
