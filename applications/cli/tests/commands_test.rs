//! Subcommands against real WAV files

use cadence_cli::commands::{play, scan, tags};
use cadence_cli::{CliConfig, CliError};
use cadence_loudness::ScanConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ===== Test Helpers =====

const RATE: u32 = 8000;

fn sine_wav(dir: &Path, name: &str, amplitude: f32, seconds: f32) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..(RATE as f32 * seconds) as usize {
        let t = i as f32 / RATE as f32;
        let v = (amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 32767.0) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();
    path
}

// ===== Tests =====

#[test]
fn scan_prints_each_file_and_the_album() {
    let dir = TempDir::new().unwrap();
    let a = sine_wav(dir.path(), "a.wav", 0.1, 1.0);
    let b = sine_wav(dir.path(), "b.wav", 0.3, 1.0);

    let mut out = Vec::new();
    let report = scan::run(
        &scan::ScanOptions {
            files: vec![a.clone(), b.clone()],
            ..Default::default()
        },
        &ScanConfig::default(),
        &mut out,
    )
    .unwrap();

    assert_eq!(report.tracks.len(), 2);
    assert_eq!(report.tracks[0].0, a);
    assert_eq!(report.summary.files, 2);
    // The quieter file needs more gain
    assert!(report.tracks[0].1.gain > report.tracks[1].1.gain);

    let printed = String::from_utf8(out).unwrap();
    assert_eq!(printed.lines().count(), 3);
    assert!(printed.contains("a.wav"));
    assert!(printed.contains("[2 files"));
}

#[test]
fn scan_writes_tags_that_tags_command_shows() {
    let dir = TempDir::new().unwrap();
    let a = sine_wav(dir.path(), "a.wav", 0.2, 1.0);

    scan::run(
        &scan::ScanOptions {
            files: vec![a.clone()],
            write_tags: true,
            album: true,
        },
        &ScanConfig::default(),
        &mut Vec::new(),
    )
    .unwrap();

    let mut out = Vec::new();
    tags::run(
        &tags::TagsOptions {
            file: a.clone(),
            ..Default::default()
        },
        &mut out,
    )
    .unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("REPLAYGAIN_TRACK_GAIN="), "{printed}");
    assert!(printed.contains("REPLAYGAIN_ALBUM_GAIN="), "{printed}");
    assert!(printed.contains("playback gain"));

    let mut out = Vec::new();
    tags::run(
        &tags::TagsOptions {
            file: a,
            clear_replaygain: true,
            ..Default::default()
        },
        &mut out,
    )
    .unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert!(!printed.contains("REPLAYGAIN_"), "{printed}");
}

#[test]
fn tags_set_and_delete() {
    let dir = TempDir::new().unwrap();
    let a = sine_wav(dir.path(), "a.wav", 0.2, 0.2);

    let mut out = Vec::new();
    tags::run(
        &tags::TagsOptions {
            file: a.clone(),
            set: vec!["TITLE=First".to_string()],
            ..Default::default()
        },
        &mut out,
    )
    .unwrap();
    assert!(String::from_utf8(out).unwrap().contains("TITLE=First"));

    let mut out = Vec::new();
    tags::run(
        &tags::TagsOptions {
            file: a.clone(),
            delete: vec!["TITLE".to_string()],
            ..Default::default()
        },
        &mut out,
    )
    .unwrap();
    assert!(!String::from_utf8(out).unwrap().contains("TITLE="));

    let bad = tags::run(
        &tags::TagsOptions {
            file: a,
            set: vec!["no-equals".to_string()],
            ..Default::default()
        },
        &mut Vec::new(),
    );
    assert!(bad.is_err());
}

#[test]
fn scan_without_files_is_rejected() {
    let result = scan::run(&scan::ScanOptions::default(), &ScanConfig::default(), &mut Vec::new());
    assert!(matches!(result, Err(CliError::NoInputs)));
}

#[test]
fn scan_rejects_unsupported_files_before_decoding() {
    let dir = TempDir::new().unwrap();
    let a = sine_wav(dir.path(), "a.wav", 0.2, 0.2);
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not audio").unwrap();

    let mut out = Vec::new();
    let result = scan::run(
        &scan::ScanOptions {
            files: vec![a, notes],
            ..Default::default()
        },
        &ScanConfig::default(),
        &mut out,
    );
    assert!(matches!(result, Err(CliError::Core(_))));
    assert!(out.is_empty());
}

#[test]
fn play_runs_to_the_end_on_null_output() {
    let dir = TempDir::new().unwrap();
    let a = sine_wav(dir.path(), "a.wav", 0.2, 0.2);
    let b = sine_wav(dir.path(), "b.wav", 0.2, 0.2);
    let missing = dir.path().join("missing.wav");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not audio").unwrap();

    let options = play::PlayOptions {
        files: vec![a, missing, notes, b],
        null_output: true,
        ..Default::default()
    };
    play::run(&options, &CliConfig::default()).unwrap();
}

#[test]
fn play_with_nothing_playable_fails() {
    let dir = TempDir::new().unwrap();
    let options = play::PlayOptions {
        files: vec![dir.path().join("missing.wav")],
        null_output: true,
        ..Default::default()
    };
    assert!(matches!(
        play::run(&options, &CliConfig::default()),
        Err(CliError::NoInputs)
    ));
}
