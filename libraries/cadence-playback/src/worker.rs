//! Decode-ahead worker
//!
//! Runs on its own thread. Each turn it takes a job from the shared state
//! (decode head item, offset, generation), decodes one block with the lock
//! released, then commits the block only if the heads did not move meanwhile.

use crate::engine::{Chunk, Shared};
use crate::events::PlayerEvent;
use crate::playlist::ItemId;
use crate::resample::{fit_channels, StreamResampler};
use crate::types::{PlaybackState, Position};
use cadence_audio::AudioFile;
use cadence_core::{AudioDecoder, DecodeStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

#[derive(Debug)]
struct Job {
    item: ItemId,
    generation: u64,
    seconds: f64,
    file: Arc<AudioFile>,
}

struct OpenStream {
    item: ItemId,
    generation: u64,
    stream: Box<dyn DecodeStream>,
    resampler: Option<StreamResampler>,
    channels: u16,
    /// Where the stream actually landed after the initial seek
    seek_reached: Option<f64>,
}

enum Outcome {
    Block(Vec<f32>),
    EndOfStream,
    Failed(String),
}

pub(crate) fn run(shared: &Shared, decoder: &dyn AudioDecoder) {
    debug!("Decode worker running");
    let mut current: Option<OpenStream> = None;

    while let Some(job) = next_job(shared) {
        if current
            .as_ref()
            .is_some_and(|s| s.item != job.item || s.generation != job.generation)
        {
            current = None;
        }

        if current.is_none() {
            match open(shared, decoder, &job) {
                Ok(Some(stream)) => current = Some(stream),
                Ok(None) => {
                    commit(shared, &job, None, Outcome::EndOfStream);
                    continue;
                }
                Err(message) => {
                    commit(shared, &job, None, Outcome::Failed(message));
                    continue;
                }
            }
        }

        let Some(stream) = current.as_mut() else {
            continue;
        };
        let outcome = decode_block(stream);
        let seek_reached = stream.seek_reached.take();
        if !commit(shared, &job, seek_reached, outcome) {
            current = None;
        }
    }

    debug!("Decode worker exiting");
}

/// Block until there is decoding to do; `None` on shutdown
fn next_job(shared: &Shared) -> Option<Job> {
    let mut inner = shared.inner.lock().ok()?;
    loop {
        if inner.shutdown {
            return None;
        }

        let wants_audio = inner.state != PlaybackState::Stopped
            && shared.buffered_secs(&inner) < shared.config.buffer_target_secs();

        if wants_audio {
            if let Some(item) = inner.decode_head.item {
                match inner.playlist.file(item) {
                    Ok(file) => {
                        return Some(Job {
                            item,
                            generation: inner.generation,
                            seconds: inner.decode_head.seconds,
                            file: Arc::clone(file),
                        });
                    }
                    Err(_) => {
                        warn!("Decode head points at a removed item, stopping decode");
                        inner.decode_head = Position::none();
                        continue;
                    }
                }
            }
        }

        inner = shared.decode_wake.wait(inner).ok()?;
    }
}

/// Open the job's file at its offset; `None` when the offset is at or past the end
fn open(
    shared: &Shared,
    decoder: &dyn AudioDecoder,
    job: &Job,
) -> Result<Option<OpenStream>, String> {
    let path = job.file.path();
    let mut stream = decoder.open(path).map_err(|e| e.to_string())?;

    if stream
        .duration()
        .is_some_and(|duration| job.seconds >= duration.as_secs_f64())
    {
        debug!(
            "Offset {:.3}s is past the end of {}",
            job.seconds,
            path.display()
        );
        return Ok(None);
    }

    let mut seek_reached = None;
    if job.seconds > 0.0 {
        let reached = stream
            .seek(Duration::from_secs_f64(job.seconds))
            .map_err(|e| e.to_string())?;
        seek_reached = Some(reached.as_secs_f64());
    }

    let format = stream.format();
    let resampler = StreamResampler::for_rates(format.sample_rate.as_hz(), shared.config.sample_rate)
        .map_err(|e| e.to_string())?;

    debug!(
        "Opened {} for decode ({} Hz, {} ch) at {:.3}s",
        path.display(),
        format.sample_rate.as_hz(),
        format.channels,
        job.seconds
    );

    Ok(Some(OpenStream {
        item: job.item,
        generation: job.generation,
        stream,
        resampler,
        channels: shared.config.channels,
        seek_reached,
    }))
}

fn decode_block(open: &mut OpenStream) -> Outcome {
    match open.stream.decode_next() {
        Ok(Some(buffer)) => {
            let stereo = to_stereo(buffer.samples, buffer.format.channels);
            let resampled = match open.resampler.as_mut() {
                Some(resampler) => match resampler.process(&stereo) {
                    Ok(samples) => samples,
                    Err(e) => return Outcome::Failed(e.to_string()),
                },
                None => stereo,
            };
            Outcome::Block(fit_channels(resampled, open.channels))
        }
        Ok(None) => match open.resampler.as_mut().map(StreamResampler::flush) {
            Some(Ok(tail)) if !tail.is_empty() => Outcome::Block(fit_channels(tail, open.channels)),
            Some(Err(e)) => Outcome::Failed(e.to_string()),
            _ => Outcome::EndOfStream,
        },
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Normalize a decoded block to interleaved stereo
fn to_stereo(samples: Vec<f32>, channels: u16) -> Vec<f32> {
    match channels {
        2 => samples,
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        0 => Vec::new(),
        n => samples
            .chunks_exact(usize::from(n))
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Apply a decode outcome; returns whether the open stream stays usable
fn commit(shared: &Shared, job: &Job, seek_reached: Option<f64>, outcome: Outcome) -> bool {
    let Ok(mut inner) = shared.inner.lock() else {
        return false;
    };

    if inner.generation != job.generation || inner.decode_head.item != Some(job.item) {
        trace!("Discarding stale block for {:?}", job.item);
        return false;
    }

    if let Some(reached) = seek_reached {
        inner.decode_head.seconds = reached;
    }

    match outcome {
        Outcome::Block(samples) => {
            if !samples.is_empty() {
                let start = inner.decode_head.seconds;
                inner.decode_head.seconds += samples.len() as f64 / shared.samples_per_second();
                inner.buffered_samples += samples.len();
                inner.buffer.push_back(Chunk {
                    item: job.item,
                    start,
                    samples,
                    consumed: 0,
                });
            }
            return true;
        }
        Outcome::EndOfStream => {
            debug!(
                "Finished decoding {} at {:.3}s",
                job.file.path().display(),
                inner.decode_head.seconds
            );
        }
        Outcome::Failed(message) => {
            error!("Failed to decode {}: {}", job.file.path().display(), message);
            shared.events.push(PlayerEvent::DecodeFailed { item: job.item });
        }
    }

    let next = inner.playlist.next(job.item).ok().flatten();
    inner.decode_head = Position {
        item: next,
        seconds: 0.0,
    };
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_blocks_are_duplicated() {
        assert_eq!(to_stereo(vec![0.1, 0.2], 1), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn surround_blocks_keep_front_pair() {
        let six = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(to_stereo(six, 6), vec![1.0, 2.0]);
    }
}
