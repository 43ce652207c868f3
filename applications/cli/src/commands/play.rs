//! `cadence play`: gapless playback of a list of files

use super::{display_name, format_duration};
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use cadence_audio::{AudioFile, SymphoniaDecoder};
use cadence_audio_desktop::CpalOutput;
use cadence_core::AudioDecoder;
use cadence_loudness::read_replaygain_tags;
use cadence_playback::{AudioOutput, ItemId, NullOutput, PlaybackEngine, PlayerEvent};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub files: Vec<PathBuf>,
    /// Overrides `playback.initial_volume`
    pub volume: Option<f64>,
    /// Use track gain even when album gain is tagged
    pub track_gain: bool,
    /// Render without a device (paced, discarded)
    pub null_output: bool,
    /// Overrides `output.device`
    pub device: Option<String>,
}

fn open_output(options: &PlayOptions, config: &CliConfig) -> Result<(Box<dyn AudioOutput>, PlaybackEngine)> {
    if options.null_output {
        let engine = PlaybackEngine::new(config.playback.clone())?;
        return Ok((Box::new(NullOutput::default()), engine));
    }

    let device = options.device.as_ref().or(config.output.device.as_ref());
    let output = match device {
        Some(name) => CpalOutput::with_device_name(name)?,
        None => CpalOutput::new()?,
    };
    let engine = PlaybackEngine::new(output.playback_config(config.playback.clone()))?;
    Ok((Box::new(output), engine))
}

pub fn run(options: &PlayOptions, config: &CliConfig) -> Result<()> {
    let (mut output, engine) = open_output(options, config)?;
    if let Some(volume) = options.volume {
        engine.set_volume(volume)?;
    }

    let prefer_album = config.output.prefer_album_gain && !options.track_gain;
    let mut names: HashMap<ItemId, (String, Option<Duration>)> = HashMap::new();

    let decoder = SymphoniaDecoder::new();
    for path in &options.files {
        if !decoder.supports_format(path) {
            warn!("Skipping {}: unsupported format", path.display());
            eprintln!("skipping {}: unsupported format", path.display());
            continue;
        }
        let file = match AudioFile::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                eprintln!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let gain = read_replaygain_tags(&file).playback_gain(prefer_album);
        let duration = file.duration();
        let item = engine.insert(Arc::new(file), gain, None)?;
        names.insert(item, (display_name(path), duration));
    }
    if names.is_empty() {
        return Err(CliError::NoInputs);
    }

    output.start(engine.renderer())?;
    engine.play()?;
    info!("Playing {} files", names.len());

    let events = engine.events();
    loop {
        match events.wait_timeout(Duration::from_millis(250))? {
            Some(PlayerEvent::NowPlaying) => {
                if let Some((name, duration)) =
                    engine.play_position().item.and_then(|item| names.get(&item))
                {
                    println!("> {} [{}]", name, format_duration(*duration));
                }
            }
            Some(PlayerEvent::BufferUnderrun) => warn!("Buffer underrun"),
            Some(PlayerEvent::DecodeFailed { item }) => {
                if let Some((name, _)) = names.get(&item) {
                    eprintln!("cannot decode {name}, skipping");
                }
            }
            None => {}
        }
        if engine.play_position().item.is_none() {
            break;
        }
    }

    output.stop()?;
    info!("Playback finished");
    Ok(())
}
