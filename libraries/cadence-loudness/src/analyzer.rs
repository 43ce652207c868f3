//! EBU R128 loudness analysis
//!
//! Wraps the ebur128 crate. The analyzer runs in histogram mode so that the
//! state of every file in a batch can be kept cheaply and combined afterwards
//! with [`LoudnessAnalyzer::combined_loudness`], which gates over all blocks
//! of all files as if they were one program.

use crate::error::{LoudnessError, Result};
use ebur128::{EbuR128, Mode};
use std::fmt;

/// Loudness characteristics of the audio fed so far
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessInfo {
    /// Integrated loudness in LUFS; `None` when everything was below the gate
    pub integrated_lufs: Option<f64>,

    /// True peak across channels (linear, 4x oversampled)
    pub true_peak: f64,

    /// Sample peak across channels (linear)
    pub sample_peak: f64,

    /// Duration of the analyzed audio in seconds
    pub duration_seconds: f64,
}

impl LoudnessInfo {
    /// Whether the measurement found no audible content
    pub fn is_silent(&self) -> bool {
        self.integrated_lufs.is_none()
    }

    /// Peak to report: true peak when available, otherwise sample peak
    pub fn peak(&self) -> f64 {
        self.true_peak.max(self.sample_peak)
    }
}

impl fmt::Display for LoudnessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.integrated_lufs {
            Some(lufs) => write!(f, "Loudness: {:.1} LUFS", lufs)?,
            None => write!(f, "Loudness: silent")?,
        }
        write!(
            f,
            ", True Peak: {:.4}, Sample Peak: {:.4}, Duration: {:.1}s",
            self.true_peak, self.sample_peak, self.duration_seconds
        )
    }
}

/// EBU R128 loudness analyzer
///
/// # Example
///
/// ```
/// use cadence_loudness::LoudnessAnalyzer;
///
/// let mut analyzer = LoudnessAnalyzer::new(48000, 2)?;
/// analyzer.add_frames(&vec![0.0_f32; 48000 * 2])?;
///
/// let info = analyzer.measure()?;
/// assert!(info.is_silent());
/// # Ok::<(), cadence_loudness::LoudnessError>(())
/// ```
pub struct LoudnessAnalyzer {
    ebur128: EbuR128,
    sample_rate: u32,
    channels: u32,
    frames_processed: usize,
}

impl fmt::Debug for LoudnessAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoudnessAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("frames_processed", &self.frames_processed)
            .finish_non_exhaustive()
    }
}

impl LoudnessAnalyzer {
    /// Create a new loudness analyzer
    ///
    /// # Errors
    /// Returns error if the sample rate is outside 8-384 kHz or the channel
    /// count outside 1-8
    pub fn new(sample_rate: u32, channels: u32) -> Result<Self> {
        if !(8000..=384_000).contains(&sample_rate) {
            return Err(LoudnessError::InvalidSampleRate(sample_rate));
        }
        if !(1..=8).contains(&channels) {
            return Err(LoudnessError::InvalidChannelCount(channels));
        }

        let mode = Mode::I | Mode::SAMPLE_PEAK | Mode::TRUE_PEAK | Mode::HISTOGRAM;
        let ebur128 = EbuR128::new(channels, sample_rate, mode)?;

        Ok(Self {
            ebur128,
            sample_rate,
            channels,
            frames_processed: 0,
        })
    }

    /// Add interleaved f32 frames
    ///
    /// The slice length must be a multiple of the channel count.
    pub fn add_frames(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        if samples.len() % self.channels as usize != 0 {
            return Err(LoudnessError::AnalysisError(format!(
                "Sample count {} is not divisible by channel count {}",
                samples.len(),
                self.channels
            )));
        }

        self.ebur128.add_frames_f32(samples)?;
        self.frames_processed += samples.len() / self.channels as usize;
        Ok(())
    }

    /// Measure everything fed so far without consuming the analyzer
    pub fn measure(&self) -> Result<LoudnessInfo> {
        let integrated = self.ebur128.loudness_global()?;

        let mut true_peak = 0.0_f64;
        let mut sample_peak = 0.0_f64;
        for ch in 0..self.channels {
            true_peak = true_peak.max(self.ebur128.true_peak(ch)?);
            sample_peak = sample_peak.max(self.ebur128.sample_peak(ch)?);
        }

        Ok(LoudnessInfo {
            integrated_lufs: integrated.is_finite().then_some(integrated),
            true_peak,
            sample_peak,
            duration_seconds: self.duration_seconds(),
        })
    }

    /// Seconds of audio fed so far
    pub fn duration_seconds(&self) -> f64 {
        self.frames_processed as f64 / f64::from(self.sample_rate)
    }

    /// Number of frames fed so far
    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Integrated loudness of several analyzers treated as one program
    ///
    /// Returns `None` for an empty set or when all of it is silent.
    pub fn combined_loudness<'a>(
        analyzers: impl IntoIterator<Item = &'a LoudnessAnalyzer>,
    ) -> Result<Option<f64>> {
        let states: Vec<&EbuR128> = analyzers.into_iter().map(|a| &a.ebur128).collect();
        if states.is_empty() {
            return Ok(None);
        }
        let loudness = EbuR128::loudness_global_multiple(states.into_iter())?;
        Ok(loudness.is_finite().then_some(loudness))
    }
}
