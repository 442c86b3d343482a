use thiserror::Error;

/// Caller contract violations reported by the analysis core.
///
/// Numeric degeneracies (empty input, zero sums, silence) are not errors;
/// they yield zero-valued results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Frequency and time-domain buffers of one tick must have equal length.
    #[error("frequency buffer has {frequency} bins but time buffer has {time} samples")]
    LengthMismatch { frequency: usize, time: usize },

    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
