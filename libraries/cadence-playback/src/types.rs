//! Core types for the playback engine

use crate::error::{PlaybackError, Result};
use crate::playlist::ItemId;
use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Initial state; nothing is decoded ahead
    #[default]
    Stopped,

    /// Output drains the buffer in real time
    Playing,

    /// Output emits silence; decode-ahead keeps filling
    Paused,
}

/// A point in the playlist: an item and an offset into it
///
/// `item` is `None` when the playlist is empty or the head has run past the
/// last item.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Item the head is in
    pub item: Option<ItemId>,
    /// Seconds from the start of that item
    pub seconds: f64,
}

impl Position {
    /// Position at an offset into an item
    pub fn new(item: ItemId, seconds: f64) -> Self {
        Self {
            item: Some(item),
            seconds,
        }
    }

    /// Position outside any item
    pub fn none() -> Self {
        Self::default()
    }
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Output sample rate in Hz; streams at other rates are resampled (default: 44100)
    pub sample_rate: u32,

    /// Output channel count (default: 2)
    pub channels: u16,

    /// How far decoding runs ahead of the play head, in milliseconds (default: 200)
    pub buffer_target_ms: u32,

    /// Bound on queued events; the oldest is dropped when full (default: unbounded)
    pub max_pending_events: Option<usize>,

    /// Initial linear volume (default: 1.0)
    pub initial_volume: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_target_ms: 200,
            max_pending_events: None,
            initial_volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Check the configuration can drive an engine
    pub fn validate(&self) -> Result<()> {
        if !(8000..=384_000).contains(&self.sample_rate) {
            return Err(PlaybackError::InvalidConfig(format!(
                "sample_rate {} outside 8000-384000",
                self.sample_rate
            )));
        }
        if !(1..=8).contains(&self.channels) {
            return Err(PlaybackError::InvalidConfig(format!(
                "channels {} outside 1-8",
                self.channels
            )));
        }
        if self.buffer_target_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "buffer_target_ms must be positive".to_string(),
            ));
        }
        if self.max_pending_events == Some(0) {
            return Err(PlaybackError::InvalidConfig(
                "max_pending_events must be positive when set".to_string(),
            ));
        }
        if !self.initial_volume.is_finite() || self.initial_volume < 0.0 {
            return Err(PlaybackError::InvalidConfig(format!(
                "initial_volume {} must be a non-negative number",
                self.initial_volume
            )));
        }
        Ok(())
    }

    /// Decode-ahead target in seconds
    pub fn buffer_target_secs(&self) -> f64 {
        f64::from(self.buffer_target_ms) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 2);
        assert_eq!(config.buffer_target_ms, 200);
        assert_eq!(config.max_pending_events, None);
        assert_eq!(config.initial_volume, 1.0);
        assert!(config.validate().is_ok());
        assert!((config.buffer_target_secs() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            PlaybackConfig {
                sample_rate: 100,
                ..Default::default()
            },
            PlaybackConfig {
                channels: 0,
                ..Default::default()
            },
            PlaybackConfig {
                buffer_target_ms: 0,
                ..Default::default()
            },
            PlaybackConfig {
                max_pending_events: Some(0),
                ..Default::default()
            },
            PlaybackConfig {
                initial_volume: f64::NAN,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn initial_state_is_stopped() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
        assert_eq!(Position::none().item, None);
    }
}
