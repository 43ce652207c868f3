/// Audio-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Container could not be probed or holds no audio track
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Seek error
    #[error("Seek error: {0}")]
    SeekError(String),

    /// Tag read/write error
    #[error("Tag error: {0}")]
    TagError(String),

    /// Empty or otherwise unusable tag key
    #[error("Invalid tag key: {0:?}")]
    InvalidTagKey(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl From<lofty::error::LoftyError> for AudioError {
    fn from(err: lofty::error::LoftyError) -> Self {
        AudioError::TagError(err.to_string())
    }
}

impl From<AudioError> for cadence_core::CadenceError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::FileNotFound(path) => cadence_core::CadenceError::not_found("File", path),
            AudioError::TagError(_) | AudioError::InvalidTagKey(_) => {
                cadence_core::CadenceError::metadata(err.to_string())
            }
            AudioError::Io(e) => cadence_core::CadenceError::Io(e),
            other => cadence_core::CadenceError::audio(other.to_string()),
        }
    }
}
