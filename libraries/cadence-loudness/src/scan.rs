//! Batch ReplayGain scan job
//!
//! ```text
//! add(file, token) ... add(file, token)
//!          │
//!          ▼
//!        exec() ── for each entry, in order ──────────────────────────┐
//!          │   decode ─► LoudnessAnalyzer ─► on_progress(token, f)    │
//!          │                                 (every interval seconds) │
//!          │   measure ─► FileGain ─► on_complete(token, gain)        │
//!          │◄─────────────────────────────────────────────────────────┘
//!          ▼
//!   combined loudness of all analyzers ─► ScanSummary
//! ```
//!
//! Callbacks run synchronously on the thread that called `exec`. Each one
//! receives a [`ScanControl`] and may call `abort()`; the job checks the flag
//! after every callback and between files.

use crate::analyzer::LoudnessAnalyzer;
use crate::error::{LoudnessError, Result};
use crate::replaygain::{
    gain_for_loudness, FileGain, ScanSummary, REPLAYGAIN_REFERENCE_LUFS,
};
use cadence_audio::{AudioFile, SymphoniaDecoder};
use cadence_core::AudioDecoder;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scan job settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Decoded seconds between progress callbacks for a file
    pub progress_interval_secs: f64,
    /// Target loudness the gains are computed against
    pub reference_lufs: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            progress_interval_secs: 2.0,
            reference_lufs: REPLAYGAIN_REFERENCE_LUFS,
        }
    }
}

/// Cancellation handle for a running scan
///
/// Cheap to clone; a clone taken before `exec` can abort from another thread.
#[derive(Debug, Clone, Default)]
pub struct ScanControl {
    aborted: Arc<AtomicBool>,
}

impl ScanControl {
    /// Ask the scan to stop at the next check point
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

type ProgressCallback<'a, T> = Box<dyn FnMut(&T, f64, &ScanControl) + 'a>;
type CompleteCallback<'a, T> = Box<dyn FnMut(&T, FileGain, &ScanControl) + 'a>;

/// A batch loudness scan over registered files
///
/// `T` is an opaque host token handed back verbatim in callbacks.
///
/// # Example
///
/// ```no_run
/// use cadence_audio::AudioFile;
/// use cadence_loudness::{ReplayGainScan, ScanConfig};
/// use std::sync::Arc;
///
/// let mut scan = ReplayGainScan::new(ScanConfig::default());
/// for (i, path) in ["a.flac", "b.flac"].iter().enumerate() {
///     scan.add(Arc::new(AudioFile::open(path)?), i);
/// }
/// scan.on_complete(|index, gain, _| println!("#{index}: {:+.2} dB", gain.gain_db()));
///
/// let summary = scan.exec()?;
/// println!("album: {:+.2} dB, peak {:.4}", summary.gain_db(), summary.peak);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ReplayGainScan<'a, T> {
    entries: Vec<(Arc<AudioFile>, T)>,
    decoder: Arc<dyn AudioDecoder>,
    config: ScanConfig,
    control: ScanControl,
    on_progress: Option<ProgressCallback<'a, T>>,
    on_complete: Option<CompleteCallback<'a, T>>,
}

impl<'a, T> ReplayGainScan<'a, T> {
    /// Create a scan that decodes with Symphonia
    pub fn new(config: ScanConfig) -> Self {
        Self::with_decoder(config, Arc::new(SymphoniaDecoder::new()))
    }

    /// Create a scan with a custom decoder
    pub fn with_decoder(config: ScanConfig, decoder: Arc<dyn AudioDecoder>) -> Self {
        Self {
            entries: Vec::new(),
            decoder,
            config,
            control: ScanControl::default(),
            on_progress: None,
            on_complete: None,
        }
    }

    /// Register a file with its host token
    pub fn add(&mut self, file: Arc<AudioFile>, token: T) {
        self.entries.push((file, token));
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no files are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Called with the fraction (0.0-1.0) of the current file decoded so far
    pub fn on_progress(&mut self, callback: impl FnMut(&T, f64, &ScanControl) + 'a) {
        self.on_progress = Some(Box::new(callback));
    }

    /// Called once per file when its measurement is done
    pub fn on_complete(&mut self, callback: impl FnMut(&T, FileGain, &ScanControl) + 'a) {
        self.on_complete = Some(Box::new(callback));
    }

    /// Handle that can abort this scan
    pub fn control(&self) -> ScanControl {
        self.control.clone()
    }

    /// Run the scan to completion, blocking the calling thread
    ///
    /// Files are measured in registration order. Fails on the first file that
    /// cannot be decoded; completion callbacks already delivered stand.
    ///
    /// # Errors
    /// `LoudnessError::Decode` for unreadable files, `LoudnessError::Aborted`
    /// when a callback or another thread requested an abort.
    pub fn exec(&mut self) -> Result<ScanSummary> {
        info!("Scanning {} file(s)", self.entries.len());
        self.check_abort()?;
        if self.entries.is_empty() {
            return Ok(ScanSummary::empty());
        }

        let mut analyzers = Vec::with_capacity(self.entries.len());
        let mut peak = 0.0_f64;
        let mut duration_seconds = 0.0_f64;

        for (file, token) in &self.entries {
            self.check_abort()?;

            let analyzer = measure_file(
                self.decoder.as_ref(),
                file,
                token,
                self.config.progress_interval_secs,
                &self.control,
                self.on_progress.as_mut(),
            )?;

            let info = analyzer.measure()?;
            let gain = FileGain::from_info(&info, self.config.reference_lufs);
            debug!("{}: {}", file.path().display(), info);

            if let Some(callback) = self.on_complete.as_mut() {
                callback(token, gain, &self.control);
            }
            self.check_abort()?;

            peak = peak.max(gain.peak);
            duration_seconds += info.duration_seconds;
            analyzers.push(analyzer);
        }

        let loudness_lufs = LoudnessAnalyzer::combined_loudness(&analyzers)?;
        let summary = ScanSummary {
            gain: gain_for_loudness(loudness_lufs, self.config.reference_lufs),
            peak,
            loudness_lufs,
            files: analyzers.len(),
            duration_seconds,
        };

        info!(
            "Scan finished: {} file(s), gain {:+.2} dB, peak {:.4}",
            summary.files,
            summary.gain_db(),
            summary.peak
        );
        Ok(summary)
    }

    fn check_abort(&self) -> Result<()> {
        if self.control.is_aborted() {
            warn!("Scan aborted");
            return Err(LoudnessError::Aborted);
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for ReplayGainScan<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGainScan")
            .field("files", &self.entries.len())
            .field("config", &self.config)
            .field("aborted", &self.control.is_aborted())
            .finish_non_exhaustive()
    }
}

/// Decode one file completely into a fresh analyzer, reporting progress
fn measure_file<T>(
    decoder: &dyn AudioDecoder,
    file: &AudioFile,
    token: &T,
    interval_secs: f64,
    control: &ScanControl,
    mut on_progress: Option<&mut ProgressCallback<'_, T>>,
) -> Result<LoudnessAnalyzer> {
    let decode_error = |e: cadence_core::CadenceError| LoudnessError::Decode {
        path: file.path().to_path_buf(),
        message: e.to_string(),
    };

    let mut stream = decoder.open(file.path()).map_err(decode_error)?;
    let format = stream.format();
    let mut analyzer =
        LoudnessAnalyzer::new(format.sample_rate.as_hz(), u32::from(format.channels))?;

    let total_secs = file
        .duration()
        .or_else(|| stream.duration())
        .map(|d| d.as_secs_f64())
        .filter(|secs| *secs > 0.0);
    let mut next_report = interval_secs;

    let mut report = |fraction: f64| -> Result<()> {
        if let Some(callback) = on_progress.as_mut() {
            callback(token, fraction, control);
        }
        if control.is_aborted() {
            warn!("Scan aborted while measuring {}", file.path().display());
            return Err(LoudnessError::Aborted);
        }
        Ok(())
    };

    while let Some(buffer) = stream.decode_next().map_err(decode_error)? {
        analyzer.add_frames(&buffer.samples)?;

        let decoded_secs = analyzer.duration_seconds();
        if decoded_secs >= next_report {
            report(total_secs.map_or(0.0, |total| (decoded_secs / total).min(1.0)))?;
            next_report = if interval_secs > 0.0 {
                ((decoded_secs / interval_secs).floor() + 1.0) * interval_secs
            } else {
                0.0
            };
        }
    }

    // Every file ends on 1.0, including ones shorter than the interval
    report(1.0)?;

    Ok(analyzer)
}
