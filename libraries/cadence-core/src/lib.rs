//! Cadence Core
//!
//! Platform-agnostic building blocks shared by every Cadence crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio Types**: `AudioBuffer`, `AudioFormat`, `SampleRate`
//! - **Collaborator Traits**: `AudioDecoder` and `DecodeStream`, the boundary
//!   between the playback/scan engines and whatever turns files into PCM
//! - **Error Handling**: unified `CadenceError` and `Result` types
//! - **Process Setup**: `init()` and the global diagnostic verbosity
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{AudioBuffer, AudioFormat, LogLevel, SampleRate};
//!
//! cadence_core::init();
//! let _ = cadence_core::set_log_level(LogLevel::Warning);
//!
//! let format = AudioFormat::stereo(SampleRate::CD_QUALITY);
//! let buffer = AudioBuffer::new(vec![0.0; 88_200], format);
//! assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::{CadenceError, Result};
pub use logging::{init, log_level, set_log_level, LogLevel};
pub use traits::{AudioDecoder, DecodeStream};
pub use types::{AudioBuffer, AudioFormat, SampleRate};
