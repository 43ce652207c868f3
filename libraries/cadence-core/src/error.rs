/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Audio decoding errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Tag/metadata errors
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Loudness analysis errors
    #[error("Loudness error: {0}")]
    Loudness(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CadenceError {
    /// Create an audio error
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
