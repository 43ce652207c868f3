/// Streaming audio decoder using Symphonia
use crate::error::{AudioError, Result};
use cadence_core::{AudioBuffer, AudioDecoder, AudioFormat, DecodeStream, SampleRate};
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, warn};

/// -3 dB, used for centre, LFE and surround channels when folding to stereo
const FOLD_DOWN: f32 = 0.707;

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
///
/// Stateless: every `open` produces an independent [`SymphoniaStream`], so one
/// decoder is shared by the playback worker and any number of scan jobs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn open(&self, path: &Path) -> cadence_core::Result<Box<dyn DecodeStream>> {
        let stream = SymphoniaStream::open(path)?;
        Ok(Box::new(stream))
    }

    fn supports_format(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                matches!(
                    ext.to_lowercase().as_str(),
                    "mp3" | "flac" | "ogg" | "oga" | "wav" | "wave" | "m4a" | "mp4" | "aac"
                )
            })
            .unwrap_or(false)
    }
}

/// An opened file producing interleaved stereo f32 at the file's native rate
pub struct SymphoniaStream {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    duration: Option<Duration>,
    time_base: Option<TimeBase>,
    position_frames: u64,
    scratch: Option<SampleBuffer<f32>>,
}

impl std::fmt::Debug for SymphoniaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymphoniaStream")
            .field("track_id", &self.track_id)
            .field("sample_rate", &self.sample_rate)
            .field("duration", &self.duration)
            .field("position_frames", &self.position_frames)
            .finish_non_exhaustive()
    }
}

impl SymphoniaStream {
    /// Probe a file and prepare its default track for decoding
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AudioError::FileNotFound(path.display().to_string()));
        }

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("{}: {}", path.display(), e)))?;

        let reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| AudioError::UnsupportedFormat("No audio tracks found".to_string()))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let track_id = track.id;
        let time_base = track.codec_params.time_base;
        let duration = track
            .codec_params
            .n_frames
            .map(|frames| Duration::from_secs_f64(frames as f64 / f64::from(sample_rate)));

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        debug!(
            "Opened {} ({} Hz, duration {:?})",
            path.display(),
            sample_rate,
            duration
        );

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            duration,
            time_base,
            position_frames: 0,
            scratch: None,
        })
    }

    /// Native sample rate of the track
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn ts_to_duration(&self, ts: u64) -> Duration {
        match self.time_base {
            Some(tb) => {
                let Time { seconds, frac } = tb.calc_time(ts);
                Duration::from_secs(seconds) + Duration::from_secs_f64(frac)
            }
            None => Duration::from_secs_f64(ts as f64 / f64::from(self.sample_rate)),
        }
    }
}

impl DecodeStream for SymphoniaStream {
    fn format(&self) -> AudioFormat {
        AudioFormat::stereo(SampleRate::new(self.sample_rate))
    }

    fn decode_next(&mut self) -> cadence_core::Result<Option<AudioBuffer>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::DecodeError(format!("Error reading packet: {}", e)).into());
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string()).into()),
            };

            let samples = interleave_stereo(&mut self.scratch, decoded);
            if samples.is_empty() {
                continue;
            }

            let buffer = AudioBuffer::new(samples, self.format());
            self.position_frames += buffer.frames() as u64;
            return Ok(Some(buffer));
        }
    }

    fn seek(&mut self, position: Duration) -> cadence_core::Result<Duration> {
        let target = match self.duration {
            Some(duration) if position > duration => duration,
            _ => position,
        };

        let time = Time::new(target.as_secs(), f64::from(target.subsec_nanos()) / 1e9);
        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| AudioError::SeekError(e.to_string()))?;

        self.decoder.reset();

        let reached = self.ts_to_duration(seeked.actual_ts);
        self.position_frames = self.format().secs_to_frames(reached.as_secs_f64()) as u64;
        Ok(reached)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.position_frames as f64 / f64::from(self.sample_rate))
    }
}

/// Convert a decoded packet of any sample type to interleaved stereo f32
fn interleave_stereo(scratch: &mut Option<SampleBuffer<f32>>, decoded: AudioBufferRef<'_>) -> Vec<f32> {
    let spec = *decoded.spec();
    let channels = spec.channels.count();
    let needed = decoded.frames() * channels.max(1);

    if !scratch.as_ref().is_some_and(|buf| buf.capacity() >= needed) {
        *scratch = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
    }
    let Some(buf) = scratch.as_mut() else {
        return Vec::new();
    };
    buf.copy_interleaved_ref(decoded);
    fold_to_stereo(buf.samples(), channels)
}

/// Fold interleaved samples of any channel count to interleaved stereo
///
/// Samples are left unclamped so peaks above full scale survive analysis.
///
/// Layouts past stereo are treated as L, R, C, LFE, SL, SR (ITU-R BS.775);
/// channel 2 of a 3-channel file is centre, channels 2/3 of a quad file are
/// surrounds.
fn fold_to_stereo(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.iter().flat_map(|&s| [s, s]).collect(),
        2 => interleaved.to_vec(),
        n => {
            let mut out = Vec::with_capacity(interleaved.len() / n * 2);
            for frame in interleaved.chunks_exact(n) {
                let (mut l, mut r) = (frame[0], frame[1]);
                match n {
                    3 => {
                        l += frame[2] * FOLD_DOWN;
                        r += frame[2] * FOLD_DOWN;
                    }
                    4 => {
                        l += frame[2] * FOLD_DOWN;
                        r += frame[3] * FOLD_DOWN;
                    }
                    5 => {
                        l += (frame[2] + frame[3]) * FOLD_DOWN;
                        r += (frame[2] + frame[4]) * FOLD_DOWN;
                    }
                    _ => {
                        let shared = (frame[2] + frame[3]) * FOLD_DOWN;
                        l += shared + frame[4] * FOLD_DOWN;
                        r += shared + frame[5] * FOLD_DOWN;
                    }
                }
                out.push(l);
                out.push(r);
            }
            out
        }
    }
}
