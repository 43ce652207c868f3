//! Desktop audio output for the Cadence playback engine
//!
//! `CpalOutput` implements [`cadence_playback::AudioOutput`]: the device
//! callback calls [`cadence_playback::Renderer::render`], so the engine's
//! decode-ahead buffer drains at the device's real-time rate.
//!
//! # Example
//!
//! ```no_run
//! use cadence_audio_desktop::CpalOutput;
//! use cadence_playback::{AudioOutput, PlaybackConfig, PlaybackEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut output = CpalOutput::new()?;
//!
//! // The engine must render at the device's rate and channel count
//! let engine = PlaybackEngine::new(output.playback_config(PlaybackConfig::default()))?;
//! output.start(engine.renderer())?;
//! engine.play()?;
//!
//! output.stop()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod output;

pub use error::{AudioOutputError, Result};
pub use output::CpalOutput;
