//! Output sinks
//!
//! An [`AudioOutput`] pulls audio from a [`Renderer`] at real-time rate.
//! Device-backed outputs live in platform crates; [`NullOutput`] paces a
//! thread against the wall clock and discards (or taps) the result, which is
//! enough for headless hosts and tests.

use crate::error::{PlaybackError, Result};
use crate::renderer::{RenderStatus, Renderer};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Something that drives a [`Renderer`]
pub trait AudioOutput: Send {
    /// Begin pulling audio from `renderer`
    ///
    /// # Errors
    /// Returns an error if the output is already running or cannot start
    fn start(&mut self, renderer: Renderer) -> Result<()>;

    /// Stop pulling audio; the renderer is released
    fn stop(&mut self) -> Result<()>;

    /// Whether `start` succeeded and `stop` has not been called
    fn is_running(&self) -> bool;
}

type Tap = Box<dyn FnMut(&[f32], RenderStatus) + Send>;

/// Output that renders on a paced background thread
pub struct NullOutput {
    period: Duration,
    tap: Option<Tap>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<Option<Tap>>>,
}

impl std::fmt::Debug for NullOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullOutput")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl NullOutput {
    /// Render one block every `period`
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            tap: None,
            stop_tx: None,
            thread: None,
        }
    }

    /// Also hand each rendered block to `tap`
    #[must_use]
    pub fn with_tap(mut self, tap: impl FnMut(&[f32], RenderStatus) + Send + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    fn block_len(&self, renderer: &Renderer) -> usize {
        let frames = (self.period.as_secs_f64() * f64::from(renderer.sample_rate())).round();
        (frames as usize).max(1) * usize::from(renderer.channels())
    }
}

impl Default for NullOutput {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl AudioOutput for NullOutput {
    fn start(&mut self, renderer: Renderer) -> Result<()> {
        if self.is_running() {
            return Err(PlaybackError::Output("already running".to_string()));
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let period = self.period;
        let mut block = vec![0.0_f32; self.block_len(&renderer)];
        let mut tap = self.tap.take();

        let thread = thread::Builder::new()
            .name("cadence-null-output".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let status = renderer.render(&mut block);
                    if let Some(tap) = tap.as_mut() {
                        tap(&block, status);
                    }
                }
                tap
            })?;

        debug!("Null output started ({:?} period)", period);
        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Disconnection also stops the thread
            let _ = stop_tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            self.tap = thread
                .join()
                .map_err(|_| PlaybackError::Output("output thread panicked".to_string()))?;
            debug!("Null output stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
