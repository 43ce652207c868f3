//! Player events
//!
//! The engine pushes events from the decode worker and the output callback;
//! the host reads them with `poll`, `wait` or `peek`. Delivery is FIFO with no
//! de-duplication. When `max_pending_events` is set the oldest event is
//! evicted to make room, otherwise the queue is unbounded.

use crate::error::{PlaybackError, Result};
use crate::playlist::ItemId;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// Events emitted by the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The play head moved to a new current item
    NowPlaying,

    /// Output asked for audio while the buffer was empty
    BufferUnderrun,

    /// An item could not be opened or decoded and was skipped
    DecodeFailed {
        /// The skipped item
        item: ItemId,
    },
}

#[derive(Debug, Default)]
struct Queue {
    events: VecDeque<PlayerEvent>,
    closed: bool,
}

#[derive(Debug)]
struct Inner {
    queue: Mutex<Queue>,
    ready: Condvar,
    capacity: Option<usize>,
}

/// Event queue shared between the engine and the host
///
/// Cloning is cheap; all clones read the same queue.
#[derive(Debug, Clone)]
pub struct EventChannel {
    inner: Arc<Inner>,
}

impl EventChannel {
    /// Create a channel, optionally bounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(Queue::default()),
                ready: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Queue an event and wake waiters
    pub(crate) fn push(&self, event: PlayerEvent) {
        let Ok(mut queue) = self.inner.queue.lock() else {
            warn!("Dropping {:?}: event queue lock poisoned", event);
            return;
        };
        if queue.closed {
            return;
        }
        if let Some(capacity) = self.inner.capacity {
            while queue.events.len() >= capacity {
                if let Some(evicted) = queue.events.pop_front() {
                    warn!("Event queue full, evicting {:?}", evicted);
                }
            }
        }
        queue.events.push_back(event);
        drop(queue);
        self.inner.ready.notify_all();
    }

    /// Mark the channel closed; pending events can still be read
    pub(crate) fn close(&self) {
        if let Ok(mut queue) = self.inner.queue.lock() {
            queue.closed = true;
        }
        self.inner.ready.notify_all();
    }

    /// Take the oldest event without blocking
    ///
    /// # Errors
    /// `EventChannelClosed` once the engine is gone and the queue is drained.
    pub fn poll(&self) -> Result<Option<PlayerEvent>> {
        let mut queue = self.inner.queue.lock()?;
        match queue.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if queue.closed => Err(PlaybackError::EventChannelClosed),
            None => Ok(None),
        }
    }

    /// Block until an event is available and take it
    ///
    /// # Errors
    /// `EventChannelClosed` once the engine is gone and the queue is drained.
    pub fn wait(&self) -> Result<PlayerEvent> {
        let mut queue = self.inner.queue.lock()?;
        loop {
            if let Some(event) = queue.events.pop_front() {
                return Ok(event);
            }
            if queue.closed {
                return Err(PlaybackError::EventChannelClosed);
            }
            queue = self.inner.ready.wait(queue)?;
        }
    }

    /// Like `wait`, giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<PlayerEvent>> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock()?;
        loop {
            if let Some(event) = queue.events.pop_front() {
                return Ok(Some(event));
            }
            if queue.closed {
                return Err(PlaybackError::EventChannelClosed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            queue = self.inner.ready.wait_timeout(queue, deadline - now)?.0;
        }
    }

    /// Whether an event is pending, without consuming it
    ///
    /// With `block` the call waits until one arrives.
    pub fn peek(&self, block: bool) -> Result<bool> {
        let mut queue = self.inner.queue.lock()?;
        if !block {
            return Ok(!queue.events.is_empty());
        }
        loop {
            if !queue.events.is_empty() {
                return Ok(true);
            }
            if queue.closed {
                return Err(PlaybackError::EventChannelClosed);
            }
            queue = self.inner.ready.wait(queue)?;
        }
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.inner.queue.lock().map(|q| q.events.len()).unwrap_or(0)
    }

    /// Whether no events are pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(None)
    }
}
