//! Error types for loudness analysis and scanning

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loudness operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur during loudness analysis
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Invalid channel count
    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(u32),

    /// EBU R128 analysis error
    #[error("EBU R128 analysis failed: {0}")]
    AnalysisError(String),

    /// A file in a scan could not be opened or decoded
    #[error("Failed to decode {}: {message}", path.display())]
    Decode {
        /// File that failed
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// The scan was aborted from a callback or another thread
    #[error("Scan aborted")]
    Aborted,

    /// Tag reading or writing error
    #[error("Tag error: {0}")]
    TagError(String),
}

impl From<ebur128::Error> for LoudnessError {
    fn from(err: ebur128::Error) -> Self {
        Self::AnalysisError(format!("{:?}", err))
    }
}

impl From<cadence_audio::AudioError> for LoudnessError {
    fn from(err: cadence_audio::AudioError) -> Self {
        Self::TagError(err.to_string())
    }
}

impl From<LoudnessError> for cadence_core::CadenceError {
    fn from(err: LoudnessError) -> Self {
        cadence_core::CadenceError::Loudness(err.to_string())
    }
}
