pub mod bands;
pub mod beat;
pub mod decode;
pub mod features;
pub mod history;
pub mod pipeline;
pub mod quality;
pub mod rhythm;
pub mod source;
pub mod spectral;
pub mod tempo;

pub use beat::BeatDetector;
pub use features::{BeatResult, FeatureVector, TickSnapshot};
pub use pipeline::AudioPipeline;
pub use quality::{QualityGovernor, QualityLevel};
pub use rhythm::RhythmAnalyzer;
pub use source::{AnalysisFrame, FrameQueue, FrameSource, PcmAnalyser};
pub use spectral::SpectralExtractor;
pub use tempo::TempoTracker;
