//! Audio feature extraction and beat detection for music visualizers.
//!
//! [`audio`] holds the analysis core: per-tick spectral features, beat and
//! drum-hit detection, tempo and rhythm tracking. [`visual`] turns its output
//! into decaying effect pulses, particles and draw primitives. [`engine`]
//! wires both to an injected [`audio::FrameSource`].

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod visual;

pub use engine::{Engine, EngineConfig};
pub use error::{AnalysisError, Result};
