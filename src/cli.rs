use clap::Parser;
use std::path::PathBuf;

use beatscope::audio::bands::BandMode;
use beatscope::visual::{ColorScheme, RenderMode};

#[derive(Parser, Debug)]
#[command(name = "beatscope", about = "Beat, tempo and rhythm analysis for music visualizers")]
pub struct Cli {
    /// Input audio files (WAV, MP3, FLAC, OGG)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Config file (defaults to beatscope.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Analysis ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// FFT size (power of two); the analyser emits half as many bins
    #[arg(long, default_value_t = 2048)]
    pub fft_size: usize,

    /// Detector sensitivity, higher fires more readily
    #[arg(short, long, default_value_t = 1.0)]
    pub sensitivity: f32,

    /// Analyser smoothing time constant (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// How band bin ranges are derived
    #[arg(long, value_enum)]
    pub band_mode: Option<BandMode>,

    /// Render mode used for the scene statistics in the dump
    #[arg(short, long, value_enum)]
    pub mode: Option<RenderMode>,

    #[arg(long, value_enum)]
    pub color_scheme: Option<ColorScheme>,

    /// Write per-tick snapshots to this JSON file
    #[arg(long)]
    pub dump: Option<PathBuf>,

    /// Lower analysis quality when ticks overrun the frame budget
    #[arg(long)]
    pub adaptive: bool,

    /// Particle RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
}
