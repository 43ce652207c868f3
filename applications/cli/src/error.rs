/// CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No input files given")]
    NoInputs,

    #[error(transparent)]
    Core(#[from] cadence_core::CadenceError),

    #[error(transparent)]
    Audio(#[from] cadence_audio::AudioError),

    #[error(transparent)]
    Loudness(#[from] cadence_loudness::LoudnessError),

    #[error(transparent)]
    Playback(#[from] cadence_playback::PlaybackError),

    #[error(transparent)]
    Output(#[from] cadence_audio_desktop::AudioOutputError),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
