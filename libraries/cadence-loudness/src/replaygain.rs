//! ReplayGain 2.0 calculation
//!
//! ReplayGain 2.0 is based on EBU R128 loudness measurement and uses
//! -18 LUFS as the reference level.
//!
//! - File Gain = Reference Level - File Integrated Loudness
//! - Batch Gain = Reference Level - Integrated Loudness of all files gated together
//!
//! Gains are reported as linear multipliers, the form the playback engine
//! applies per item. Silent audio gets the neutral gain 1.0.

use crate::analyzer::LoudnessInfo;
use serde::{Deserialize, Serialize};

/// ReplayGain 2.0 reference loudness level (-18 LUFS)
pub const REPLAYGAIN_REFERENCE_LUFS: f64 = -18.0;

/// Convert decibels to a linear amplitude multiplier
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear amplitude multiplier to decibels
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.log10()
}

/// Linear gain that brings `loudness_lufs` to `reference_lufs`
pub fn gain_for_loudness(loudness_lufs: Option<f64>, reference_lufs: f64) -> f64 {
    loudness_lufs.map_or(1.0, |lufs| db_to_linear(reference_lufs - lufs))
}

/// Per-file scan result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileGain {
    /// Suggested linear gain multiplier
    pub gain: f64,
    /// Peak amplitude (linear, 1.0 = full scale)
    pub peak: f64,
    /// Measured integrated loudness; `None` for silent files
    pub loudness_lufs: Option<f64>,
    /// Decoded duration in seconds
    pub duration_seconds: f64,
}

impl FileGain {
    /// Derive the file gain from a loudness measurement
    pub fn from_info(info: &LoudnessInfo, reference_lufs: f64) -> Self {
        Self {
            gain: gain_for_loudness(info.integrated_lufs, reference_lufs),
            peak: info.peak(),
            loudness_lufs: info.integrated_lufs,
            duration_seconds: info.duration_seconds,
        }
    }

    /// Gain in dB
    pub fn gain_db(&self) -> f64 {
        linear_to_db(self.gain)
    }

    /// Check if applying this gain would push the peak past full scale
    pub fn would_clip(&self) -> bool {
        self.gain * self.peak > 1.0
    }

    /// Gain limited so the peak stays at or below full scale
    pub fn safe_gain(&self) -> f64 {
        if self.peak > 0.0 {
            self.gain.min(1.0 / self.peak)
        } else {
            self.gain
        }
    }
}

/// Batch recommendation returned by a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Suggested linear gain for the batch played as one program
    pub gain: f64,
    /// Highest peak of any file (linear)
    pub peak: f64,
    /// Integrated loudness of the whole batch; `None` when all of it is silent
    pub loudness_lufs: Option<f64>,
    /// Number of files measured
    pub files: usize,
    /// Total decoded duration in seconds
    pub duration_seconds: f64,
}

impl ScanSummary {
    /// Summary of a batch with nothing audible in it
    pub fn empty() -> Self {
        Self {
            gain: 1.0,
            peak: 0.0,
            loudness_lufs: None,
            files: 0,
            duration_seconds: 0.0,
        }
    }

    /// Gain in dB
    pub fn gain_db(&self) -> f64 {
        linear_to_db(self.gain)
    }

    /// Check if applying this gain would push the loudest peak past full scale
    pub fn would_clip(&self) -> bool {
        self.gain * self.peak > 1.0
    }
}
