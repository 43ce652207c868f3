//! Loudness analysis and ReplayGain scanning for Cadence
//!
//! This crate provides:
//! - EBU R128 loudness measurement (integrated LUFS, sample and true peak)
//! - ReplayGain 2.0 gain calculation as linear multipliers
//! - A blocking, cancelable batch scan job with progress and completion callbacks
//! - ReplayGain tag reading/writing on top of the `AudioFile` tag API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ AudioFile   │ ──► │ LoudnessAnalyzer │ ──► │  FileGain    │ ──► on_complete
//! └─────────────┘     └──────────────────┘     └──────────────┘
//!                              │ (one per file, kept)
//!                              ▼
//!                     ┌──────────────────┐     ┌──────────────┐
//!                     │ combined gating  │ ──► │ ScanSummary  │ ──► Tag Writer
//!                     └──────────────────┘     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cadence_audio::AudioFile;
//! use cadence_loudness::{write_replaygain_tags, ReplayGainScan, ScanConfig};
//! use std::sync::Arc;
//!
//! let file = Arc::new(AudioFile::open("track.flac")?);
//! let mut gains = Vec::new();
//!
//! let summary = {
//!     let mut scan = ReplayGainScan::new(ScanConfig::default());
//!     scan.add(Arc::clone(&file), ());
//!     scan.on_complete(|_, gain, _| gains.push(gain));
//!     scan.exec()?
//! };
//!
//! write_replaygain_tags(&file, &gains[0], Some(&summary), -18.0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod error;
mod replaygain;
mod scan;
mod tags;

pub use analyzer::{LoudnessAnalyzer, LoudnessInfo};
pub use error::{LoudnessError, Result};
pub use replaygain::{
    db_to_linear, gain_for_loudness, linear_to_db, FileGain, ScanSummary,
    REPLAYGAIN_REFERENCE_LUFS,
};
pub use scan::{ReplayGainScan, ScanConfig, ScanControl};
pub use tags::{
    read_replaygain_tags, remove_replaygain_tags, set_replaygain_tags, write_replaygain_tags,
    ReplayGainTags,
};
