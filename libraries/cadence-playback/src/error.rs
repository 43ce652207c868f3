//! Error types for the playback engine

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The item handle was removed or never belonged to this playlist
    #[error("Invalid or removed playlist item")]
    InvalidItem,

    /// The engine was torn down and no events remain
    #[error("Event channel closed")]
    EventChannelClosed,

    /// A thread panicked while holding the engine lock
    #[error("Engine state lock poisoned")]
    LockPoisoned,

    /// Volume must be a finite, non-negative multiplier
    #[error("Invalid volume: {0}")]
    InvalidVolume(f64),

    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resampler setup or processing failed
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Output device error
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

impl<T> From<std::sync::PoisonError<T>> for PlaybackError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

impl From<PlaybackError> for cadence_core::CadenceError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::InvalidItem => {
                cadence_core::CadenceError::invalid_input("invalid or removed playlist item")
            }
            PlaybackError::Io(e) => cadence_core::CadenceError::Io(e),
            other => cadence_core::CadenceError::Playback(other.to_string()),
        }
    }
}
