//! Per-file summaries and the optional JSON tick dump.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::audio::{QualityLevel, TickSnapshot};
use crate::visual::{PrimitiveCounts, VisualEffects};

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub duration_secs: f32,
    pub ticks: u64,
    pub silent_ticks: u64,
    pub beats: u64,
    pub kicks: u64,
    pub snares: u64,
    pub hihats: u64,
    pub onsets: u64,
    pub tempo_bpm: f32,
    pub tempo_confidence: f32,
    pub mean_rhythm_strength: f32,
    pub final_quality: QualityLevel,
}

/// Accumulates a [`FileSummary`] one tick at a time.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    ticks: u64,
    silent_ticks: u64,
    beats: u64,
    kicks: u64,
    snares: u64,
    hihats: u64,
    onsets: u64,
    rhythm_sum: f64,
    last: TickSnapshot,
}

impl SummaryBuilder {
    pub fn record(&mut self, snapshot: &TickSnapshot) {
        self.ticks += 1;
        self.silent_ticks += u64::from(snapshot.features.silent);
        self.beats += u64::from(snapshot.beat.beat);
        self.kicks += u64::from(snapshot.beat.kick);
        self.snares += u64::from(snapshot.beat.snare);
        self.hihats += u64::from(snapshot.beat.hihat);
        self.onsets += u64::from(snapshot.features.onset);
        self.rhythm_sum += f64::from(snapshot.rhythm_strength);
        self.last = snapshot.clone();
    }

    pub fn finish(self, path: &Path, duration_secs: f32, final_quality: QualityLevel) -> FileSummary {
        let mean_rhythm_strength = if self.ticks == 0 {
            0.0
        } else {
            (self.rhythm_sum / self.ticks as f64) as f32
        };
        FileSummary {
            path: path.to_path_buf(),
            duration_secs,
            ticks: self.ticks,
            silent_ticks: self.silent_ticks,
            beats: self.beats,
            kicks: self.kicks,
            snares: self.snares,
            hihats: self.hihats,
            onsets: self.onsets,
            tempo_bpm: self.last.tempo_bpm,
            tempo_confidence: self.last.tempo_confidence,
            mean_rhythm_strength,
            final_quality,
        }
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.path.display())?;
        writeln!(
            f,
            "  duration {:.1}s, {} ticks ({} silent), quality {:?}",
            self.duration_secs, self.ticks, self.silent_ticks, self.final_quality
        )?;
        writeln!(
            f,
            "  beats {}  kicks {}  snares {}  hihats {}  onsets {}",
            self.beats, self.kicks, self.snares, self.hihats, self.onsets
        )?;
        if self.tempo_bpm > 0.0 {
            writeln!(f, "  tempo {:.1} BPM (confidence {:.2})", self.tempo_bpm, self.tempo_confidence)?;
        } else {
            writeln!(f, "  tempo n/a")?;
        }
        write!(f, "  rhythm strength {:.3}", self.mean_rhythm_strength)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    #[serde(flatten)]
    pub snapshot: TickSnapshot,
    pub effects: VisualEffects,
    pub primitives: PrimitiveCounts,
}

#[derive(Debug, Serialize)]
pub struct FileDump {
    pub summary: FileSummary,
    pub ticks: Vec<TickRecord>,
}

pub fn write_dump(path: &Path, files: &[FileDump]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create dump: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), files)
        .with_context(|| format!("Failed to write dump: {}", path.display()))?;
    log::info!("Wrote tick dump for {} file(s) to {}", files.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BeatResult, FeatureVector};

    fn snapshot(beat: bool, rhythm: f32) -> TickSnapshot {
        TickSnapshot {
            features: FeatureVector::default(),
            beat: BeatResult {
                beat,
                kick: beat,
                ..BeatResult::default()
            },
            tempo_bpm: 120.0,
            tempo_confidence: 0.9,
            rhythm_strength: rhythm,
        }
    }

    #[test]
    fn counts_events_and_averages_rhythm() {
        let mut builder = SummaryBuilder::default();
        builder.record(&snapshot(true, 0.2));
        builder.record(&snapshot(false, 0.4));
        builder.record(&TickSnapshot {
            features: FeatureVector::silent(50.0),
            ..TickSnapshot::default()
        });
        let summary = builder.finish(Path::new("song.wav"), 3.0, QualityLevel::High);
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.silent_ticks, 1);
        assert_eq!(summary.beats, 1);
        assert_eq!(summary.kicks, 1);
        assert_eq!(summary.tempo_bpm, 0.0);
        assert!((summary.mean_rhythm_strength - 0.2).abs() < 1e-6);
        assert!(summary.to_string().contains("tempo n/a"));
    }

    #[test]
    fn empty_summary_has_zero_means() {
        let summary = SummaryBuilder::default().finish(Path::new("x.wav"), 0.0, QualityLevel::Low);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.mean_rhythm_strength, 0.0);
    }

    #[test]
    fn dump_is_valid_json() {
        let mut builder = SummaryBuilder::default();
        let tick = snapshot(true, 0.5);
        builder.record(&tick);
        let dump = FileDump {
            summary: builder.finish(Path::new("a.wav"), 1.0, QualityLevel::Medium),
            ticks: vec![TickRecord {
                snapshot: tick,
                effects: VisualEffects::default(),
                primitives: PrimitiveCounts::default(),
            }],
        };

        let file = tempfile::NamedTempFile::new().unwrap();
        write_dump(file.path(), &[dump]).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["summary"]["beats"], 1);
        assert_eq!(value[0]["summary"]["final_quality"], "Medium");
        assert_eq!(value[0]["ticks"][0]["beat"]["kick"], true);
        assert_eq!(value[0]["ticks"][0]["tempo_bpm"], 120.0);
    }
}
