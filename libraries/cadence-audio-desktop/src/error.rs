/// Audio output errors
use thiserror::Error;

/// Result type for audio output operations
pub type Result<T> = std::result::Result<T, AudioOutputError>;

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioOutputError {
    /// No output device
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device with the given name not found
    #[error("Audio device '{0}' not found")]
    NamedDeviceNotFound(String),

    /// Failed to enumerate devices
    #[error("Failed to enumerate audio devices: {0}")]
    EnumerationFailed(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    PlayError(String),

    /// Device sample format the renderer cannot feed
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Engine and device disagree on rate or channel count
    #[error("Renderer produces {renderer_rate} Hz/{renderer_channels} ch, device expects {device_rate} Hz/{device_channels} ch")]
    FormatMismatch {
        /// Engine output rate
        renderer_rate: u32,
        /// Engine channel count
        renderer_channels: u16,
        /// Device rate
        device_rate: u32,
        /// Device channel count
        device_channels: u16,
    },

    /// The audio thread is gone
    #[error("Audio thread is not running")]
    ThreadGone,

    /// CPAL error
    #[error("CPAL error: {0}")]
    CpalError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::BuildStreamError> for AudioOutputError {
    fn from(err: cpal::BuildStreamError) -> Self {
        AudioOutputError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for AudioOutputError {
    fn from(err: cpal::PlayStreamError) -> Self {
        AudioOutputError::PlayError(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for AudioOutputError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        AudioOutputError::CpalError(err.to_string())
    }
}

impl From<cpal::DevicesError> for AudioOutputError {
    fn from(err: cpal::DevicesError) -> Self {
        AudioOutputError::EnumerationFailed(err.to_string())
    }
}

impl From<AudioOutputError> for cadence_playback::PlaybackError {
    fn from(err: AudioOutputError) -> Self {
        cadence_playback::PlaybackError::Output(err.to_string())
    }
}

impl From<AudioOutputError> for cadence_core::CadenceError {
    fn from(err: AudioOutputError) -> Self {
        cadence_core::CadenceError::Playback(err.to_string())
    }
}
