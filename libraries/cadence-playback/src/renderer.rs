//! Output side of the engine
//!
//! An output (device callback or paced thread) calls [`Renderer::render`]
//! with a block of interleaved samples to fill. Rendering drains the
//! decode-ahead buffer, applies item gain and volume (limited to full scale),
//! advances the play head and raises `NowPlaying` / `BufferUnderrun`.

use crate::engine::{Inner, Shared};
use crate::events::PlayerEvent;
use crate::types::{PlaybackState, Position};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a call to [`Renderer::render`] produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The whole block was filled with audio
    Playing,
    /// Waiting for the first audio after play or a seek; block is silent
    Buffering,
    /// The buffer ran dry mid-playback; the tail of the block is silent
    Underrun,
    /// Paused; block is silent
    Paused,
    /// Stopped; block is silent
    Stopped,
    /// The play head has passed the end of the playlist
    Idle,
}

/// Pulls rendered audio out of a [`PlaybackEngine`](crate::PlaybackEngine)
///
/// Cheap to clone. A renderer outliving its engine renders silence.
#[derive(Debug, Clone)]
pub struct Renderer {
    shared: Arc<Shared>,
}

impl Renderer {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.shared.config.sample_rate
    }

    /// Output channel count
    pub fn channels(&self) -> u16 {
        self.shared.config.channels
    }

    /// Fill `out` with the next block of interleaved output samples
    pub fn render(&self, out: &mut [f32]) -> RenderStatus {
        let Ok(mut inner) = self.shared.inner.lock() else {
            out.fill(0.0);
            return RenderStatus::Stopped;
        };

        if inner.shutdown {
            out.fill(0.0);
            return RenderStatus::Stopped;
        }
        match inner.state {
            PlaybackState::Stopped => {
                out.fill(0.0);
                return RenderStatus::Stopped;
            }
            PlaybackState::Paused => {
                out.fill(0.0);
                return RenderStatus::Paused;
            }
            PlaybackState::Playing => {}
        }

        let written = self.drain(&mut inner, out);
        out[written..].fill(0.0);

        let status = if written == out.len() {
            RenderStatus::Playing
        } else if inner.decode_head.item.is_none() {
            if inner.play_head.item.is_some() {
                debug!("Reached end of playlist");
                inner.play_head = Position::none();
            }
            RenderStatus::Idle
        } else if inner.primed {
            if !inner.underrun_reported {
                inner.underrun_reported = true;
                warn!(
                    "Buffer underrun at {:?} @ {:.3}s",
                    inner.play_head.item, inner.play_head.seconds
                );
                self.shared.events.push(PlayerEvent::BufferUnderrun);
            }
            RenderStatus::Underrun
        } else {
            RenderStatus::Buffering
        };

        drop(inner);
        self.shared.decode_wake.notify_all();
        status
    }

    /// Copy buffered audio into `out`; returns samples written
    fn drain(&self, inner: &mut Inner, out: &mut [f32]) -> usize {
        let samples_per_second = self.shared.samples_per_second();
        let mut written = 0;

        while written < out.len() {
            let Some(front) = inner.buffer.front() else {
                break;
            };
            let item = front.item;

            if inner.play_head.item != Some(item) {
                inner.play_head = Position::new(
                    item,
                    front.start + front.consumed as f64 / samples_per_second,
                );
                debug!("Now playing {:?}", item);
                self.shared.events.push(PlayerEvent::NowPlaying);
            }

            let gain = (inner.playlist.gain(item).unwrap_or(1.0) * inner.volume) as f32;

            let Some(chunk) = inner.buffer.front_mut() else {
                break;
            };
            let n = (out.len() - written).min(chunk.remaining());
            let source = &chunk.samples[chunk.consumed..chunk.consumed + n];
            for (dst, src) in out[written..written + n].iter_mut().zip(source) {
                *dst = (src * gain).clamp(-1.0, 1.0);
            }
            chunk.consumed += n;
            let position = chunk.start + chunk.consumed as f64 / samples_per_second;
            let finished = chunk.remaining() == 0;

            if finished {
                inner.buffer.pop_front();
            }
            inner.buffered_samples = inner.buffered_samples.saturating_sub(n);
            inner.play_head.seconds = position;
            written += n;
        }

        if written > 0 {
            inner.primed = true;
            inner.underrun_reported = false;
        }
        written
    }
}
