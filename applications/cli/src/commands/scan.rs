//! `cadence scan`: ReplayGain analysis, optionally written back as tags

use super::display_name;
use crate::error::{CliError, Result};
use cadence_audio::{AudioFile, SymphoniaDecoder};
use cadence_core::{AudioDecoder, CadenceError};
use cadence_loudness::{
    linear_to_db, write_replaygain_tags, FileGain, ReplayGainScan, ScanConfig, ScanSummary,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// What to scan and what to do with the results
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub files: Vec<PathBuf>,
    /// Save track (and album) gain tags into each file
    pub write_tags: bool,
    /// Treat the files as one album when writing tags
    pub album: bool,
}

/// Per-file gains in input order plus the batch summary
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub tracks: Vec<(PathBuf, FileGain)>,
    pub summary: ScanSummary,
}

/// Suffix for files whose gain would clip, with the gain that would not
fn clip_note(gain: &FileGain) -> String {
    if gain.would_clip() {
        format!(" (clips, safe {:+.2} dB)", linear_to_db(gain.safe_gain()))
    } else {
        String::new()
    }
}

pub fn run(options: &ScanOptions, config: &ScanConfig, out: &mut impl Write) -> Result<ScanReport> {
    if options.files.is_empty() {
        return Err(CliError::NoInputs);
    }
    let decoder = SymphoniaDecoder::new();
    if let Some(path) = options.files.iter().find(|path| !decoder.supports_format(path)) {
        return Err(CadenceError::invalid_input(format!(
            "unsupported format: {}",
            path.display()
        ))
        .into());
    }

    let files = options
        .files
        .iter()
        .map(|path| AudioFile::open(path).map(Arc::new))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tracks = Vec::with_capacity(files.len());
    let summary = {
        let mut scan = ReplayGainScan::new(config.clone());
        for (index, file) in files.iter().enumerate() {
            scan.add(Arc::clone(file), index);
        }
        scan.on_progress(|&index, fraction, _| {
            eprint!(
                "\r{:>3.0}%  {}",
                fraction * 100.0,
                display_name(&options.files[index])
            );
        });
        scan.on_complete(|&index, gain, _| {
            eprintln!();
            tracks.push((options.files[index].clone(), gain));
        });
        scan.exec()?
    };

    for (path, gain) in &tracks {
        writeln!(
            out,
            "{:+7.2} dB  peak {:.6}{}  {}",
            gain.gain_db(),
            gain.peak,
            clip_note(gain),
            path.display()
        )
        .map_err(CadenceError::from)?;
    }
    writeln!(
        out,
        "{:+7.2} dB  peak {:.6}  [{} files, {:.1}s]",
        summary.gain_db(),
        summary.peak,
        summary.files,
        summary.duration_seconds
    )
    .map_err(CadenceError::from)?;

    if options.write_tags {
        let album = options.album.then_some(&summary);
        for (file, (_, gain)) in files.iter().zip(&tracks) {
            write_replaygain_tags(file, gain, album, config.reference_lufs)?;
        }
        info!("Wrote ReplayGain tags to {} files", files.len());
    }

    Ok(ScanReport { tracks, summary })
}
