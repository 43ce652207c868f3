/// Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// PCM layout of a decoded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of interleaved channels (1 = mono, 2 = stereo, etc.)
    pub channels: u16,
}

impl AudioFormat {
    /// Create a new audio format
    pub fn new(sample_rate: SampleRate, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Interleaved stereo at the given rate
    pub fn stereo(sample_rate: SampleRate) -> Self {
        Self::new(sample_rate, 2)
    }

    /// Convert a frame count at this rate to seconds
    pub fn frames_to_secs(&self, frames: usize) -> f64 {
        frames as f64 / f64::from(self.sample_rate.as_hz())
    }

    /// Convert seconds to a whole number of frames at this rate
    pub fn secs_to_frames(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * f64::from(self.sample_rate.as_hz())).round() as usize
    }
}

/// Block of decoded PCM
///
/// Samples are f32 with full scale at ±1.0; lossy sources may overshoot
/// Interleaved format: [L, R, L, R, ...] for stereo
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Audio samples (f32, interleaved)
    pub samples: Vec<f32>,

    /// Audio format information
    pub format: AudioFormat,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, format: AudioFormat) -> Self {
        Self { samples, format }
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.format.frames_to_secs(self.frames())
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
