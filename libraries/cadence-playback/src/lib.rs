//! Cadence Playback - gapless playlist engine
//!
//! This crate provides:
//! - A doubly linked playlist with versioned item handles and per-item gain
//! - A decode worker that runs ahead of the output by a configurable target
//! - Two positions: the decode head and the play head
//! - An event channel (`NowPlaying`, `BufferUnderrun`, `DecodeFailed`) with
//!   poll, wait and peek
//! - A [`Renderer`] that outputs pull audio from, plus a paced [`NullOutput`]
//!
//! # Architecture
//!
//! ```text
//!            insert/remove/seek/play
//!   host ───────────────────────────► PlaybackEngine
//!    ▲                                     │ owns
//!    │ poll/wait/peek            ┌─────────┴──────────┐
//!    │                           ▼                    ▼
//!  EventChannel ◄── events ── decode worker ──► decode-ahead buffer
//!    ▲                      (AudioDecoder,            │
//!    │                       resampling)              ▼
//!    └──────────── events ─────────────────── Renderer::render ◄── AudioOutput
//! ```
//!
//! The engine never talks to a device. Platform crates implement
//! [`AudioOutput`] and call [`Renderer::render`] from their callback.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_audio::AudioFile;
//! use cadence_playback::{
//!     AudioOutput, NullOutput, PlaybackConfig, PlaybackEngine, PlayerEvent,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = PlaybackEngine::new(PlaybackConfig::default())?;
//! let file = Arc::new(AudioFile::open("music/track.flac")?);
//! let item = engine.insert(file, 1.0, None)?;
//!
//! let mut output = NullOutput::default();
//! output.start(engine.renderer())?;
//! engine.play()?;
//!
//! let events = engine.events();
//! while let Some(event) = events.wait_timeout(Duration::from_secs(1))? {
//!     if event == PlayerEvent::NowPlaying {
//!         println!("now playing {:?}", engine.play_position());
//!     }
//! }
//! # let _ = item;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
pub mod error;
pub mod events;
pub mod output;
pub mod playlist;
mod renderer;
pub mod resample;
pub mod types;
mod worker;

pub use engine::{PlaybackEngine, PlaylistEntry};
pub use error::{PlaybackError, Result};
pub use events::{EventChannel, PlayerEvent};
pub use output::{AudioOutput, NullOutput};
pub use playlist::{ItemId, Playlist};
pub use renderer::{RenderStatus, Renderer};
pub use types::{PlaybackConfig, PlaybackState, Position};
