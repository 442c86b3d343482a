//! Adaptive quality under frame-budget pressure.
//!
//! The governor watches how long each tick takes and, on sustained overrun,
//! steps down to a smaller FFT and a coarser tick rate. It never touches the
//! analyser directly; it hands back a level and the host rebuilds the
//! [`AnalysisConfig`] from it.

use serde::Serialize;

use super::history::History;
use crate::config::AnalysisConfig;

/// 60 fps
pub const DEFAULT_BUDGET_MS: f32 = 1000.0 / 60.0;

const WINDOW: usize = 30;
const RECOVER_RATIO: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum QualityLevel {
    Low,
    Medium,
    High,
}

impl QualityLevel {
    pub fn fft_size(self) -> usize {
        match self {
            QualityLevel::Low => 512,
            QualityLevel::Medium => 1024,
            QualityLevel::High => 2048,
        }
    }

    /// Source frames consumed per analysed tick.
    pub fn frame_stride(self) -> usize {
        match self {
            QualityLevel::Low => 2,
            QualityLevel::Medium | QualityLevel::High => 1,
        }
    }

    /// Closest level for an FFT size.
    pub fn from_fft_size(fft_size: usize) -> Self {
        if fft_size >= 2048 {
            QualityLevel::High
        } else if fft_size >= 1024 {
            QualityLevel::Medium
        } else {
            QualityLevel::Low
        }
    }

    pub fn lower(self) -> Option<Self> {
        match self {
            QualityLevel::High => Some(QualityLevel::Medium),
            QualityLevel::Medium => Some(QualityLevel::Low),
            QualityLevel::Low => None,
        }
    }

    pub fn higher(self) -> Option<Self> {
        match self {
            QualityLevel::Low => Some(QualityLevel::Medium),
            QualityLevel::Medium => Some(QualityLevel::High),
            QualityLevel::High => None,
        }
    }

    /// `base` with this level's FFT size.
    pub fn apply(self, base: &AnalysisConfig) -> AnalysisConfig {
        AnalysisConfig {
            fft_size: self.fft_size(),
            ..base.clone()
        }
    }
}

pub struct QualityGovernor {
    level: QualityLevel,
    ceiling: QualityLevel,
    budget_ms: f32,
    frame_times: History,
}

impl QualityGovernor {
    /// `ceiling` is both the starting level and the highest one it recovers to.
    pub fn new(ceiling: QualityLevel, budget_ms: f32) -> Self {
        Self {
            level: ceiling,
            ceiling,
            budget_ms,
            frame_times: History::new(WINDOW),
        }
    }

    pub fn level(&self) -> QualityLevel {
        self.level
    }

    /// Follows a level chosen outside the governor; timings taken at the
    /// old level are dropped.
    pub fn set_level(&mut self, level: QualityLevel) {
        self.level = level.min(self.ceiling);
        self.frame_times.clear();
    }

    /// Records one tick's cost; returns the new level when it changes.
    pub fn record(&mut self, frame_ms: f32) -> Option<QualityLevel> {
        self.frame_times.push(frame_ms);
        if self.frame_times.len() < WINDOW {
            return None;
        }

        let average = self.frame_times.mean();
        let candidate = if average > self.budget_ms {
            self.level.lower()
        } else if average < self.budget_ms * RECOVER_RATIO && self.level < self.ceiling {
            self.level.higher()
        } else {
            None
        };
        let next = candidate?;

        log::info!(
            "quality {:?} -> {:?} (avg tick {:.2}ms, budget {:.2}ms)",
            self.level, next, average, self.budget_ms
        );
        self.level = next;
        // Judge the new level on its own timings
        self.frame_times.clear();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_down_on_sustained_overrun() {
        let mut governor = QualityGovernor::new(QualityLevel::High, DEFAULT_BUDGET_MS);
        let changes: Vec<_> = (0..WINDOW).filter_map(|_| governor.record(25.0)).collect();
        assert_eq!(changes, vec![QualityLevel::Medium]);

        let changes: Vec<_> = (0..WINDOW * 3).filter_map(|_| governor.record(25.0)).collect();
        assert_eq!(changes, vec![QualityLevel::Low]);
        assert_eq!(governor.level(), QualityLevel::Low);
    }

    #[test]
    fn single_spike_is_tolerated() {
        let mut governor = QualityGovernor::new(QualityLevel::High, DEFAULT_BUDGET_MS);
        assert!(governor.record(100.0).is_none());
        for _ in 0..WINDOW * 2 {
            assert!(governor.record(11.0).is_none());
        }
        assert_eq!(governor.level(), QualityLevel::High);
    }

    #[test]
    fn recovers_but_not_past_ceiling() {
        let mut governor = QualityGovernor::new(QualityLevel::Medium, DEFAULT_BUDGET_MS);
        for _ in 0..WINDOW {
            governor.record(30.0);
        }
        assert_eq!(governor.level(), QualityLevel::Low);
        for _ in 0..WINDOW * 4 {
            governor.record(1.0);
        }
        assert_eq!(governor.level(), QualityLevel::Medium);
    }

    #[test]
    fn recovers_from_externally_set_level() {
        let mut governor = QualityGovernor::new(QualityLevel::High, DEFAULT_BUDGET_MS);
        governor.set_level(QualityLevel::Low);
        assert_eq!(governor.level(), QualityLevel::Low);
        let changes: Vec<_> = (0..WINDOW * 2).filter_map(|_| governor.record(1.0)).collect();
        assert_eq!(changes, vec![QualityLevel::Medium, QualityLevel::High]);
    }

    #[test]
    fn set_level_is_capped_at_ceiling() {
        let mut governor = QualityGovernor::new(QualityLevel::Medium, DEFAULT_BUDGET_MS);
        governor.set_level(QualityLevel::High);
        assert_eq!(governor.level(), QualityLevel::Medium);
    }

    #[test]
    fn apply_only_changes_fft_size() {
        let base = AnalysisConfig {
            sensitivity: 1.7,
            ..AnalysisConfig::default()
        };
        let low = QualityLevel::Low.apply(&base);
        assert_eq!(low.fft_size, 512);
        assert_eq!(low.sensitivity, 1.7);
        assert!(low.validate().is_ok());
    }
}
