//! Cadence Audio
//!
//! File handles and decoding for the Cadence engines.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  open/probe   ┌───────────────────┐
//! │  AudioFile   │──────────────▶│  SymphoniaStream  │  (duration, decodability)
//! │  path, dirty │               └───────────────────┘
//! │  tag map     │◀── lofty ───  read on open, written by save()
//! └──────────────┘
//!
//! ┌──────────────────┐  open(path)  ┌───────────────────┐
//! │ SymphoniaDecoder │─────────────▶│  SymphoniaStream  │──▶ interleaved stereo f32
//! │ (AudioDecoder)   │              │  (DecodeStream)   │
//! └──────────────────┘              └───────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_audio::{AudioFile, TagFlags};
//!
//! let file = AudioFile::open("music/track.flac")?;
//! println!("{} ({:?})", file.short_names(), file.duration());
//!
//! file.metadata_set("COMMENT", Some("ripped"), TagFlags::NONE)?;
//! assert!(file.is_dirty());
//! file.save()?;
//! # Ok::<(), cadence_audio::AudioError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decoder;
pub mod error;
pub mod file;
pub mod tags;

pub use decoder::{SymphoniaDecoder, SymphoniaStream};
pub use error::{AudioError, Result};
pub use file::AudioFile;
pub use tags::{Tag, TagFlags};
