//! Input side of the analysis core.
//!
//! The core never reaches for its input; an [`Engine`](crate::engine::Engine)
//! is handed a [`FrameSource`] and pulls one buffer pair per tick from it.
//! [`PcmAnalyser`] stands in for a real-time analyser node: it windows the PCM
//! at the playback position, applies the node's magnitude smoothing and maps
//! decibels onto [0, 1].

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

use super::decode::AudioData;
use crate::config::AnalysisConfig;

/// One tick of analyser output. Both buffers have the same length.
#[derive(Clone, Debug, Default)]
pub struct AnalysisFrame {
    /// Magnitudes in [0, 1]
    pub frequency: Vec<f32>,
    /// Samples in [-1, 1]
    pub time: Vec<f32>,
    pub timestamp_ms: f64,
}

pub trait FrameSource {
    /// Next tick's buffers, `None` once the signal is exhausted.
    fn next_frame(&mut self) -> Option<AnalysisFrame>;

    /// Advances past one frame without producing it, `None` once exhausted.
    fn skip_frame(&mut self) -> Option<()> {
        self.next_frame().map(drop)
    }

    /// Takes effect from the next frame on.
    fn reconfigure(&mut self, _config: &AnalysisConfig) {}

    /// Total number of frames, when known up front.
    fn frame_count(&self) -> Option<u64> {
        None
    }
}

/// Pre-built frames, mostly for tests and replays.
#[derive(Default)]
pub struct FrameQueue {
    frames: VecDeque<AnalysisFrame>,
}

impl FrameQueue {
    pub fn new(frames: impl IntoIterator<Item = AnalysisFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for FrameQueue {
    fn next_frame(&mut self) -> Option<AnalysisFrame> {
        self.frames.pop_front()
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }
}

/// Analyser-node emulation over decoded mono PCM.
pub struct PcmAnalyser {
    samples: Vec<f32>,
    sample_rate: u32,
    fps: u32,
    tick: u64,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl PcmAnalyser {
    pub fn new(audio: AudioData, config: &AnalysisConfig, fps: u32) -> Self {
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        Self {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            fps: fps.max(1),
            tick: 0,
            fft_size,
            fft: planner.plan_fft_forward(fft_size),
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing,
            min_db: config.min_db,
            max_db: config.max_db,
        }
    }

    /// Sample index the current tick's window ends at.
    fn position(&self) -> usize {
        (self.tick as f64 * self.sample_rate as f64 / self.fps as f64) as usize
    }

    fn analyse_window(&mut self, end: usize) -> AnalysisFrame {
        let n = self.fft_size;
        let half = n / 2;
        let start = end as isize - n as isize;

        for i in 0..n {
            let idx = start + i as isize;
            let sample = if idx >= 0 {
                self.samples.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let db_range = self.max_db - self.min_db;
        let mut frequency = Vec::with_capacity(half);
        for (k, bin) in self.buffer[..half].iter().enumerate() {
            let magnitude = bin.norm() / n as f32;
            self.smoothed[k] = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
            let db = 20.0 * self.smoothed[k].max(1e-12).log10();
            frequency.push(((db - self.min_db) / db_range).clamp(0.0, 1.0));
        }

        // Most recent half window, so both buffers line up in length
        let time = (0..half)
            .map(|i| {
                let idx = start + (half + i) as isize;
                if idx >= 0 {
                    self.samples.get(idx as usize).copied().unwrap_or(0.0).clamp(-1.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect();

        AnalysisFrame {
            frequency,
            time,
            timestamp_ms: self.tick as f64 * 1000.0 / self.fps as f64,
        }
    }
}

impl FrameSource for PcmAnalyser {
    fn next_frame(&mut self) -> Option<AnalysisFrame> {
        let end = self.position();
        if end > self.samples.len() {
            return None;
        }
        let frame = self.analyse_window(end);
        self.tick += 1;
        Some(frame)
    }

    /// Moves the playback position only. Like an analyser node that is not
    /// read, no FFT runs and the smoothing state stays put.
    fn skip_frame(&mut self) -> Option<()> {
        if self.position() > self.samples.len() {
            return None;
        }
        self.tick += 1;
        Some(())
    }

    fn reconfigure(&mut self, config: &AnalysisConfig) {
        self.smoothing = config.smoothing;
        self.min_db = config.min_db;
        self.max_db = config.max_db;
        if config.fft_size != self.fft_size {
            log::debug!("analyser FFT size {} -> {}", self.fft_size, config.fft_size);
            let mut planner = FftPlanner::new();
            self.fft_size = config.fft_size;
            self.fft = planner.plan_fft_forward(self.fft_size);
            self.window = blackman_window(self.fft_size);
            self.buffer = vec![Complex::new(0.0, 0.0); self.fft_size];
            self.smoothed = vec![0.0; self.fft_size / 2];
        }
    }

    fn frame_count(&self) -> Option<u64> {
        let seconds = self.samples.len() as f64 / self.sample_rate.max(1) as f64;
        Some((seconds * self.fps as f64).floor() as u64 + 1)
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
        })
        .collect()
}
