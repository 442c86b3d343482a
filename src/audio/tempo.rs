use super::features::BeatResult;
use super::history::History;

const INTERVAL_HISTORY: usize = 16;
const BPM_HISTORY: usize = 8;

pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 200.0;

// 200 BPM -> 300ms, 60 BPM -> 1000ms
const MIN_INTERVAL_MS: f64 = 60_000.0 / MAX_BPM as f64;
const MAX_INTERVAL_MS: f64 = 60_000.0 / MIN_BPM as f64;

/// Tempo estimate from inter-beat intervals.
///
/// BPM is derived from the median interval and then averaged over the last
/// few estimates. Reads 0 until the first plausible interval is seen.
#[derive(Clone, Debug)]
pub struct TempoTracker {
    intervals: History,
    estimates: History,
    last_beat_ms: Option<f64>,
    tempo: f32,
    confidence: f32,
}

impl Default for TempoTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TempoTracker {
    pub fn new() -> Self {
        Self {
            intervals: History::new(INTERVAL_HISTORY),
            estimates: History::new(BPM_HISTORY),
            last_beat_ms: None,
            tempo: 0.0,
            confidence: 0.0,
        }
    }

    pub fn update(&mut self, beat: &BeatResult) -> f32 {
        if !beat.beat {
            return self.tempo;
        }

        if let Some(last) = self.last_beat_ms {
            let interval = beat.timestamp_ms - last;
            if (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&interval) {
                self.intervals.push(interval as f32);
                let median = self.intervals.median();
                if median > 0.0 {
                    self.estimates.push(60_000.0 / median);
                    self.tempo = self.estimates.mean().clamp(MIN_BPM, MAX_BPM);
                }
                self.confidence = self.interval_confidence();
                log::debug!(
                    "tempo {:.1} BPM (interval {:.0}ms, confidence {:.2})",
                    self.tempo, interval, self.confidence
                );
            } else {
                log::trace!("ignoring beat interval of {:.0}ms", interval);
            }
        }
        // Rejected intervals still restart the measurement from this beat
        self.last_beat_ms = Some(beat.timestamp_ms);
        self.tempo
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    fn interval_confidence(&self) -> f32 {
        if self.intervals.len() < 2 {
            return 0.0;
        }
        let mean = self.intervals.mean();
        if mean <= 0.0 {
            return 0.0;
        }
        (1.0 - self.intervals.std_dev() / mean).clamp(0.0, 1.0)
    }
}
