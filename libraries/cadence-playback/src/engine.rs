//! Playback engine - playlist, heads and decode-ahead buffer
//!
//! All mutable state lives in one [`Inner`] behind a mutex shared by three
//! parties:
//!
//! ```text
//!   host thread ──► PlaybackEngine ─┐
//!                                   ├──► Mutex<Inner> ◄── Renderer (output callback)
//!   decode worker ──────────────────┘         │
//!                                             └── buffer: chunks tagged (item, start)
//! ```
//!
//! The decode head runs ahead of the play head by up to
//! `buffer_target_ms`. Every relocation of the heads (seek, clear, removal of
//! the item being decoded) bumps `generation`; the worker drops any block it
//! decoded under an older generation.

use crate::error::{PlaybackError, Result};
use crate::events::{EventChannel, PlayerEvent};
use crate::playlist::{ItemId, Playlist};
use crate::renderer::Renderer;
use crate::types::{PlaybackConfig, PlaybackState, Position};
use crate::worker;
use cadence_audio::{AudioFile, SymphoniaDecoder};
use cadence_core::AudioDecoder;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// A block of decoded audio at output rate and channel count
#[derive(Debug)]
pub(crate) struct Chunk {
    pub(crate) item: ItemId,
    /// Offset of the first sample within the item, in seconds
    pub(crate) start: f64,
    pub(crate) samples: Vec<f32>,
    /// Samples already handed to the output
    pub(crate) consumed: usize,
}

impl Chunk {
    pub(crate) fn remaining(&self) -> usize {
        self.samples.len() - self.consumed
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    pub(crate) playlist: Playlist,
    pub(crate) state: PlaybackState,
    pub(crate) volume: f64,
    pub(crate) buffer: VecDeque<Chunk>,
    /// Unconsumed samples across `buffer`
    pub(crate) buffered_samples: usize,
    pub(crate) decode_head: Position,
    pub(crate) play_head: Position,
    pub(crate) generation: u64,
    /// Set once output has drained audio since the last relocation
    pub(crate) primed: bool,
    /// Latched after a BufferUnderrun until audio flows again
    pub(crate) underrun_reported: bool,
    pub(crate) shutdown: bool,
}

impl Inner {
    fn new(volume: f64) -> Self {
        Self {
            playlist: Playlist::new(),
            state: PlaybackState::Stopped,
            volume,
            buffer: VecDeque::new(),
            buffered_samples: 0,
            decode_head: Position::none(),
            play_head: Position::none(),
            generation: 0,
            primed: false,
            underrun_reported: false,
            shutdown: false,
        }
    }

    fn purge_item(&mut self, item: ItemId) {
        let mut dropped = 0;
        self.buffer.retain(|chunk| {
            let keep = chunk.item != item;
            if !keep {
                dropped += chunk.remaining();
            }
            keep
        });
        self.buffered_samples = self.buffered_samples.saturating_sub(dropped);
    }

    /// Drop audio decoded for `from` and every item after it
    fn purge_from(&mut self, from: ItemId) {
        let Some(start) = self.playlist.index_of(from) else {
            return;
        };
        let playlist = &self.playlist;
        let mut dropped = 0;
        self.buffer.retain(|chunk| {
            let keep = playlist
                .index_of(chunk.item)
                .is_some_and(|index| index < start);
            if !keep {
                dropped += chunk.remaining();
            }
            keep
        });
        self.buffered_samples = self.buffered_samples.saturating_sub(dropped);
    }

    fn purge_all(&mut self) {
        self.buffer.clear();
        self.buffered_samples = 0;
    }

    /// Move both heads to `position`, discarding everything buffered
    fn relocate(&mut self, position: Position) {
        self.purge_all();
        self.decode_head = position;
        self.play_head = position;
        self.generation += 1;
        self.primed = false;
        self.underrun_reported = false;
    }

    /// Make sure a freshly linked `item` is decoded in list order
    ///
    /// When decoding already ran past the new item's slot (into a later item
    /// or off the tail) and the listener has not got there yet, audio
    /// decoded for the items after it is dropped and decoding restarts at
    /// `item`.
    fn rewind_decode_to(&mut self, item: ItemId) -> Result<()> {
        let Some(slot) = self.playlist.index_of(item) else {
            return Ok(());
        };
        let index = |head: Option<ItemId>| head.and_then(|id| self.playlist.index_of(id));

        let already_played = index(self.play_head.item).is_some_and(|play| play > slot);
        let decoded_past = index(self.decode_head.item).map_or(true, |decode| decode > slot);
        if already_played || !decoded_past {
            return Ok(());
        }

        if let Some(next) = self.playlist.next(item)? {
            self.purge_from(next);
        }
        self.redirect_decode(Position::new(item, 0.0));
        Ok(())
    }

    /// Restart decoding at `position` without touching the play head
    fn redirect_decode(&mut self, position: Position) {
        self.decode_head = position;
        self.generation += 1;
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) inner: Mutex<Inner>,
    /// Signalled whenever the worker may have something to do
    pub(crate) decode_wake: Condvar,
    pub(crate) events: EventChannel,
    pub(crate) config: PlaybackConfig,
}

impl Shared {
    /// Interleaved samples per second of output audio
    pub(crate) fn samples_per_second(&self) -> f64 {
        f64::from(self.config.sample_rate) * f64::from(self.config.channels)
    }

    pub(crate) fn buffered_secs(&self, inner: &Inner) -> f64 {
        inner.buffered_samples as f64 / self.samples_per_second()
    }

    /// Lock for reading, recovering the state if a holder panicked
    pub(crate) fn read(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One playlist entry as seen from outside the engine
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    /// Item handle
    pub item: ItemId,
    /// The linked file
    pub file: Arc<AudioFile>,
    /// Linear gain applied while the item plays
    pub gain: f64,
}

/// Gapless playlist player
///
/// Owns a playlist, a background decode worker and the event channel. Audio
/// leaves the engine through a [`Renderer`] that an output drives; the engine
/// never opens a device itself.
///
/// Dropping the engine stops the worker and closes the event channel.
#[derive(Debug)]
pub struct PlaybackEngine {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Create an engine that decodes with Symphonia
    pub fn new(config: PlaybackConfig) -> Result<Self> {
        Self::with_decoder(config, Arc::new(SymphoniaDecoder::new()))
    }

    /// Create an engine with a custom decoder
    pub fn with_decoder(config: PlaybackConfig, decoder: Arc<dyn AudioDecoder>) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::new(config.initial_volume)),
            decode_wake: Condvar::new(),
            events: EventChannel::new(config.max_pending_events),
            config,
        });

        let worker = thread::Builder::new()
            .name("cadence-decode".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || worker::run(&shared, decoder.as_ref())
            })?;

        info!(
            "Playback engine started ({} Hz, {} ch, {} ms ahead)",
            shared.config.sample_rate, shared.config.channels, shared.config.buffer_target_ms
        );

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        Ok(self.shared.inner.lock()?)
    }

    fn wake_worker(&self) {
        self.shared.decode_wake.notify_all();
    }

    fn emit(&self, event: PlayerEvent) {
        self.shared.events.push(event);
    }

    // ===== Playlist =====

    /// Link `file` into the playlist before `before`, or at the end
    ///
    /// Inserting into an idle engine (empty playlist, or play head past the
    /// tail) makes the new item current and emits `NowPlaying`.
    pub fn insert(
        &self,
        file: Arc<AudioFile>,
        gain: f64,
        before: Option<ItemId>,
    ) -> Result<ItemId> {
        let mut inner = self.lock()?;
        let id = inner.playlist.insert(file, gain, before)?;

        let became_current = if inner.play_head.item.is_none() && inner.decode_head.item.is_none()
        {
            inner.relocate(Position::new(id, 0.0));
            true
        } else {
            inner.rewind_decode_to(id)?;
            false
        };

        debug!("Inserted item {:?} (count {})", id, inner.playlist.count());
        drop(inner);

        if became_current {
            self.emit(PlayerEvent::NowPlaying);
        }
        self.wake_worker();
        Ok(id)
    }

    /// Unlink an item, returning its file to the caller
    ///
    /// Removing the playing item moves the play head to the next item and
    /// emits `NowPlaying`; removing the last one leaves the engine idle.
    pub fn remove(&self, item: ItemId) -> Result<Arc<AudioFile>> {
        let mut inner = self.lock()?;
        let next = inner.playlist.next(item)?;
        let file = inner.playlist.remove(item)?;
        inner.purge_item(item);

        if inner.decode_head.item == Some(item) {
            inner.redirect_decode(Position {
                item: next,
                seconds: 0.0,
            });
        }

        let mut now_playing = false;
        if inner.play_head.item == Some(item) {
            inner.play_head = Position {
                item: next,
                seconds: 0.0,
            };
            inner.primed = false;
            inner.underrun_reported = false;
            now_playing = next.is_some();
        }

        debug!("Removed item {:?} (count {})", item, inner.playlist.count());
        drop(inner);

        if now_playing {
            self.emit(PlayerEvent::NowPlaying);
        }
        self.wake_worker();
        Ok(file)
    }

    /// Remove every item; both heads become empty
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        let removed = inner.playlist.clear();
        inner.relocate(Position::none());
        debug!("Cleared playlist ({} items)", removed.len());
        Ok(())
    }

    /// Number of items in the playlist
    pub fn count(&self) -> usize {
        self.shared.read().playlist.count()
    }

    /// Change an item's gain; applies to audio already buffered
    pub fn set_gain(&self, item: ItemId, gain: f64) -> Result<()> {
        self.lock()?.playlist.set_gain(item, gain)
    }

    /// Items in playlist order
    pub fn playlist_snapshot(&self) -> Vec<PlaylistEntry> {
        self.shared
            .read()
            .playlist
            .iter()
            .map(|(item, file, gain)| PlaylistEntry {
                item,
                file: Arc::clone(file),
                gain,
            })
            .collect()
    }

    /// Run `f` against the playlist while holding the engine lock
    pub fn with_playlist<R>(&self, f: impl FnOnce(&Playlist) -> R) -> R {
        f(&self.shared.read().playlist)
    }

    // ===== Transport =====

    /// Start or resume output
    pub fn play(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.state != PlaybackState::Playing {
            debug!("{:?} -> Playing", inner.state);
            inner.state = PlaybackState::Playing;
            inner.primed = false;
            inner.underrun_reported = false;
        }
        drop(inner);
        self.wake_worker();
        Ok(())
    }

    /// Output silence while keeping position and buffered audio
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.state != PlaybackState::Paused {
            debug!("{:?} -> Paused", inner.state);
            inner.state = PlaybackState::Paused;
        }
        drop(inner);
        self.wake_worker();
        Ok(())
    }

    /// Move both heads to `seconds` into `item`
    ///
    /// Negative or NaN offsets clamp to the start of the item; offsets at
    /// or past its end continue with the next item.
    pub fn seek(&self, item: ItemId, seconds: f64) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.playlist.contains(item) {
            return Err(PlaybackError::InvalidItem);
        }

        let seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };
        let changed_item = inner.play_head.item != Some(item);
        inner.relocate(Position::new(item, seconds));
        debug!("Seek to {:?} @ {:.3}s", item, seconds);
        drop(inner);

        if changed_item {
            self.emit(PlayerEvent::NowPlaying);
        }
        self.wake_worker();
        Ok(())
    }

    /// Set the output volume multiplier
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        if !volume.is_finite() || volume < 0.0 {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.lock()?.volume = volume;
        Ok(())
    }

    /// Output volume multiplier
    pub fn volume(&self) -> f64 {
        self.shared.read().volume
    }

    /// Transport state
    pub fn state(&self) -> PlaybackState {
        self.shared.read().state
    }

    /// Whether output is draining the buffer
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    // ===== Positions =====

    /// Item and offset the listener currently hears
    pub fn play_position(&self) -> Position {
        self.shared.read().play_head
    }

    /// Item and offset the decoder will produce next
    pub fn decode_position(&self) -> Position {
        self.shared.read().decode_head
    }

    /// Seconds of audio decoded but not yet played
    pub fn buffered_seconds(&self) -> f64 {
        let inner = self.shared.read();
        self.shared.buffered_secs(&inner)
    }

    // ===== Outputs =====

    /// Channel the engine reports events on
    pub fn events(&self) -> EventChannel {
        self.shared.events.clone()
    }

    /// Handle for an output to pull audio with
    pub fn renderer(&self) -> Renderer {
        Renderer::new(Arc::clone(&self.shared))
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shared.read().shutdown = true;
        self.wake_worker();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Decode worker panicked");
            }
        }
        self.shared.events.close();
        debug!("Playback engine stopped");
    }
}
