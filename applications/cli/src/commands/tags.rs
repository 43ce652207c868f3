//! `cadence tags`: inspect and edit file tags

use super::format_duration;
use crate::error::Result;
use cadence_audio::{AudioFile, TagFlags};
use cadence_loudness::{read_replaygain_tags, remove_replaygain_tags};
use std::io::Write;
use std::path::PathBuf;

/// Edits to apply before printing
#[derive(Debug, Clone, Default)]
pub struct TagsOptions {
    pub file: PathBuf,
    /// `KEY=VALUE` pairs to set
    pub set: Vec<String>,
    /// `KEY=VALUE` pairs appended to existing values
    pub append: Vec<String>,
    /// Keys to delete
    pub delete: Vec<String>,
    /// Drop all ReplayGain entries
    pub clear_replaygain: bool,
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment.split_once('=').ok_or_else(|| {
        cadence_core::CadenceError::invalid_input(format!("expected KEY=VALUE, got '{assignment}'"))
            .into()
    })
}

pub fn run(options: &TagsOptions, out: &mut impl Write) -> Result<()> {
    let file = AudioFile::open(&options.file)?;

    for assignment in &options.set {
        let (key, value) = split_assignment(assignment)?;
        file.metadata_set(key, Some(value), TagFlags::NONE)?;
    }
    for assignment in &options.append {
        let (key, value) = split_assignment(assignment)?;
        file.metadata_set(key, Some(value), TagFlags::APPEND)?;
    }
    for key in &options.delete {
        file.metadata_set(key, None, TagFlags::NONE)?;
    }
    if options.clear_replaygain {
        remove_replaygain_tags(&file)?;
    }
    if file.is_dirty() {
        file.save()?;
    }

    print_file(&file, out).map_err(cadence_core::CadenceError::from)?;
    Ok(())
}

fn print_file(file: &AudioFile, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", file.path().display())?;
    writeln!(
        out,
        "  format:   {}  duration: {}",
        file.short_names(),
        format_duration(file.duration())
    )?;

    let mut prev = None;
    while let Some(tag) = file.metadata_get("", prev.as_ref(), TagFlags::NONE) {
        writeln!(out, "  {}={}", tag.key(), tag.value())?;
        prev = Some(tag);
    }

    let replaygain = read_replaygain_tags(file);
    if replaygain.has_track_tags() || replaygain.has_album_tags() {
        writeln!(
            out,
            "  playback gain: track {:.3}x  album {:.3}x",
            replaygain.playback_gain(false),
            replaygain.playback_gain(true)
        )?;
    }
    Ok(())
}
