//! Playback engine behavior against a synthetic decoder
//!
//! The mock decoder maps file names to constant-amplitude stereo streams at
//! 8 kHz and can be stalled to starve the output on demand. The tests drive
//! the renderer by hand, so every sample the "device" sees is observable.

use cadence_audio::AudioFile;
use cadence_core::{AudioBuffer, AudioDecoder, AudioFormat, CadenceError, DecodeStream, SampleRate};
use cadence_playback::{
    AudioOutput, EventChannel, NullOutput, PlaybackConfig, PlaybackEngine, PlaybackError,
    PlaybackState, PlayerEvent, Position, RenderStatus, Renderer,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ===== Test Helpers =====

const RATE: u32 = 8000;
const BLOCK_FRAMES: usize = 80;

/// Lets a test hold the decoder inside `decode_next`
#[derive(Default)]
struct Gate {
    stalled: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn stall(&self) {
        *self.stalled.lock().unwrap() = true;
    }

    fn release(&self) {
        *self.stalled.lock().unwrap() = false;
        self.changed.notify_all();
    }

    fn pass(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut stalled = self.stalled.lock().unwrap();
        while *stalled && Instant::now() < deadline {
            stalled = self
                .changed
                .wait_timeout(stalled, Duration::from_millis(20))
                .unwrap()
                .0;
        }
    }
}

#[derive(Clone, Copy)]
struct Track {
    amplitude: f32,
    seconds: f64,
}

struct MockDecoder {
    tracks: HashMap<String, Track>,
    gate: Arc<Gate>,
}

impl AudioDecoder for MockDecoder {
    fn open(&self, path: &Path) -> cadence_core::Result<Box<dyn DecodeStream>> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let track = self
            .tracks
            .get(name)
            .copied()
            .ok_or_else(|| CadenceError::audio(format!("cannot decode {name}")))?;
        Ok(Box::new(MockStream {
            track,
            frame: 0,
            total: (track.seconds * f64::from(RATE)).round() as usize,
            gate: Arc::clone(&self.gate),
        }))
    }
}

struct MockStream {
    track: Track,
    frame: usize,
    total: usize,
    gate: Arc<Gate>,
}

impl DecodeStream for MockStream {
    fn format(&self) -> AudioFormat {
        AudioFormat::stereo(SampleRate::new(RATE))
    }

    fn decode_next(&mut self) -> cadence_core::Result<Option<AudioBuffer>> {
        self.gate.pass();
        if self.frame >= self.total {
            return Ok(None);
        }
        let frames = BLOCK_FRAMES.min(self.total - self.frame);
        self.frame += frames;
        Ok(Some(AudioBuffer::new(
            vec![self.track.amplitude; frames * 2],
            self.format(),
        )))
    }

    fn seek(&mut self, position: Duration) -> cadence_core::Result<Duration> {
        // Container demuxers refuse to seek onto or past the last frame
        let frame = (position.as_secs_f64() * f64::from(RATE)) as usize;
        if frame >= self.total {
            return Err(CadenceError::audio("seek out of range"));
        }
        self.frame = frame;
        Ok(Duration::from_secs_f64(self.frame as f64 / f64::from(RATE)))
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.track.seconds))
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.frame as f64 / f64::from(RATE))
    }
}

struct Harness {
    engine: PlaybackEngine,
    gate: Arc<Gate>,
    dir: TempDir,
}

impl Harness {
    /// Engine at 8 kHz stereo with a 100 ms decode-ahead target
    fn new(tracks: &[(&str, f32, f64)]) -> Self {
        let gate = Arc::new(Gate::default());
        let decoder = MockDecoder {
            tracks: tracks
                .iter()
                .map(|&(name, amplitude, seconds)| {
                    (name.to_string(), Track { amplitude, seconds })
                })
                .collect(),
            gate: Arc::clone(&gate),
        };
        let config = PlaybackConfig {
            sample_rate: RATE,
            channels: 2,
            buffer_target_ms: 100,
            ..PlaybackConfig::default()
        };
        let engine = PlaybackEngine::with_decoder(config, Arc::new(decoder)).unwrap();
        Self {
            engine,
            gate,
            dir: TempDir::new().unwrap(),
        }
    }

    /// A real (tiny) WAV on disk; the mock decodes by file name
    fn file(&self, name: &str) -> Arc<AudioFile> {
        let path = self.dir.path().join(name);
        write_wav(&path, RATE, 0.0, 10);
        Arc::new(AudioFile::open(&path).unwrap())
    }

    fn wait_buffered(&self, seconds: f64) {
        wait_until("decode-ahead", || self.engine.buffered_seconds() >= seconds - 1e-9);
    }
}

fn write_wav(path: &Path, rate: u32, amplitude: f32, frames: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let value = (amplitude * 32767.0) as i16;
    for _ in 0..frames * 2 {
        writer.write_sample(value).unwrap();
    }
    writer.finalize().unwrap();
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn drain(events: &EventChannel) -> Vec<PlayerEvent> {
    let mut out = Vec::new();
    while let Some(event) = events.poll().unwrap() {
        out.push(event);
    }
    out
}

fn render(renderer: &Renderer, frames: usize) -> (Vec<f32>, RenderStatus) {
    let mut block = vec![f32::NAN; frames * usize::from(renderer.channels())];
    let status = renderer.render(&mut block);
    (block, status)
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}

// ===== Playlist through the engine =====

#[test]
fn insert_into_empty_engine_makes_item_current() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let events = h.engine.events();

    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();

    assert_eq!(h.engine.play_position(), Position::new(a, 0.0));
    assert_eq!(h.engine.decode_position(), Position::new(a, 0.0));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    assert_eq!(h.engine.state(), PlaybackState::Stopped);
    assert_eq!(h.engine.count(), 1);

    // Nothing decodes ahead while stopped
    thread::sleep(Duration::from_millis(30));
    assert_eq!(h.engine.buffered_seconds(), 0.0);
}

#[test]
fn stale_handles_are_rejected() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.remove(a).unwrap();

    assert!(matches!(h.engine.seek(a, 0.0), Err(PlaybackError::InvalidItem)));
    assert!(matches!(h.engine.remove(a), Err(PlaybackError::InvalidItem)));
    assert!(matches!(h.engine.set_gain(a, 0.5), Err(PlaybackError::InvalidItem)));
    assert!(matches!(
        h.engine.insert(h.file("a.wav"), 1.0, Some(a)),
        Err(PlaybackError::InvalidItem)
    ));
    assert_eq!(h.engine.count(), 0);
}

#[test]
fn snapshot_lists_items_in_order_with_gains() {
    let h = Harness::new(&[]);
    let b = h.engine.insert(h.file("b.wav"), 0.5, None).unwrap();
    let a = h.engine.insert(h.file("a.wav"), 1.0, Some(b)).unwrap();

    let entries = h.engine.playlist_snapshot();
    let order: Vec<_> = entries.iter().map(|e| (e.item, e.gain)).collect();
    assert_eq!(order, vec![(a, 1.0), (b, 0.5)]);
    assert!(entries[1].file.path().ends_with("b.wav"));
    assert_eq!(h.engine.with_playlist(|p| p.index_of(b)), Some(1));
}

#[test]
fn clear_empties_playlist_and_heads() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0), ("b.wav", 0.5, 1.0)]);
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.05);

    h.engine.clear().unwrap();

    assert_eq!(h.engine.count(), 0);
    assert_eq!(h.engine.play_position().item, None);
    assert_eq!(h.engine.decode_position().item, None);
    assert_eq!(h.engine.buffered_seconds(), 0.0);
    let (block, status) = render(&h.engine.renderer(), 10);
    assert_eq!(status, RenderStatus::Idle);
    assert!(block.iter().all(|&s| s == 0.0));
}

// ===== Transport =====

#[test]
fn crossing_items_emits_one_now_playing_and_applies_gain() {
    let h = Harness::new(&[("a.wav", 0.5, 0.05), ("b.wav", 0.5, 1.0)]);
    let events = h.engine.events();
    let renderer = h.engine.renderer();

    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 0.5, None).unwrap();
    h.engine.set_volume(0.8).unwrap();
    drain(&events);

    h.engine.play().unwrap();
    wait_until("decode into b", || {
        h.engine.decode_position().item == Some(b) && h.engine.buffered_seconds() >= 0.09
    });

    // All of a: 400 frames at gain 1.0
    let (block, status) = render(&renderer, 400);
    assert_eq!(status, RenderStatus::Playing);
    block.iter().for_each(|&s| assert_close(s, 0.4));
    assert!(drain(&events).is_empty());
    let position = h.engine.play_position();
    assert_eq!(position.item, Some(a));
    assert!((position.seconds - 0.05).abs() < 1e-9);

    // First frame of b
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.2));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    let position = h.engine.play_position();
    assert_eq!(position.item, Some(b));
    assert!((position.seconds - 1.0 / f64::from(RATE)).abs() < 1e-9);

    // Staying inside b raises nothing further
    render(&renderer, 200);
    assert!(drain(&events).is_empty());
}

#[test]
fn decode_position_never_trails_play_position() {
    let h = Harness::new(&[("a.wav", 0.5, 0.1), ("b.wav", 0.5, 0.1), ("c.wav", 0.5, 0.1)]);
    let renderer = h.engine.renderer();
    for name in ["a.wav", "b.wav", "c.wav"] {
        h.engine.insert(h.file(name), 1.0, None).unwrap();
    }
    h.engine.play().unwrap();

    let key = |position: Position| {
        let index = position
            .item
            .and_then(|item| h.engine.with_playlist(|p| p.index_of(item)))
            .unwrap_or(usize::MAX);
        (index, position.seconds)
    };

    for _ in 0..40 {
        wait_until("audio", || {
            h.engine.buffered_seconds() >= 0.01 || h.engine.decode_position().item.is_none()
        });
        render(&renderer, BLOCK_FRAMES);

        // Only this thread moves the play head, so read it first
        let play = key(h.engine.play_position());
        let decode = key(h.engine.decode_position());
        assert!(
            decode.partial_cmp(&play) != Some(std::cmp::Ordering::Less),
            "decode {decode:?} behind play {play:?}"
        );
    }
}

#[test]
fn pause_outputs_silence_and_holds_position() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.09);
    render(&renderer, BLOCK_FRAMES);

    h.engine.pause().unwrap();
    let held = h.engine.play_position();
    let (block, status) = render(&renderer, BLOCK_FRAMES);

    assert_eq!(status, RenderStatus::Paused);
    assert!(block.iter().all(|&s| s == 0.0));
    assert_eq!(h.engine.play_position(), held);
    assert!(!h.engine.is_playing());

    // Decode-ahead tops up while paused
    h.wait_buffered(0.09);

    h.engine.play().unwrap();
    let (block, status) = render(&renderer, BLOCK_FRAMES);
    assert_eq!(status, RenderStatus::Playing);
    block.iter().for_each(|&s| assert_close(s, 0.5));
}

#[test]
fn seek_while_stopped_moves_both_heads() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0), ("b.wav", 0.7, 1.0)]);
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    drain(&events);

    h.engine.seek(b, 0.5).unwrap();
    assert_eq!(h.engine.play_position(), Position::new(b, 0.5));
    assert_eq!(h.engine.decode_position(), Position::new(b, 0.5));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);

    // Seeking within the current item is not a transition
    h.engine.seek(b, -3.0).unwrap();
    assert_eq!(h.engine.play_position(), Position::new(b, 0.0));
    assert!(drain(&events).is_empty());
}

#[test]
fn seek_past_end_continues_with_next_item() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0), ("b.wav", 0.7, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    drain(&events);

    h.engine.seek(a, 1.0).unwrap();
    wait_until("decode into b", || h.engine.decode_position().item == Some(b));
    h.wait_buffered(0.05);

    let (block, status) = render(&renderer, 1);
    assert_eq!(status, RenderStatus::Playing);
    block.iter().for_each(|&s| assert_close(s, 0.7));
    assert_eq!(h.engine.play_position().item, Some(b));
    // Skipped quietly, not reported as a failure
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
}

#[test]
fn seek_while_playing_discards_buffer_and_resumes() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0), ("b.wav", 0.7, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.09);
    drain(&events);

    // Hold the worker so the snapshot below cannot race with new blocks
    h.gate.stall();
    h.engine.seek(b, 0.5).unwrap();
    assert_eq!(h.engine.play_position(), Position::new(b, 0.5));
    assert_eq!(h.engine.decode_position(), Position::new(b, 0.5));
    assert_eq!(h.engine.buffered_seconds(), 0.0);
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    h.gate.release();

    h.wait_buffered(0.05);
    let (block, status) = render(&renderer, 1);
    assert_eq!(status, RenderStatus::Playing);
    block.iter().for_each(|&s| assert_close(s, 0.7));
    let position = h.engine.play_position();
    assert_eq!(position.item, Some(b));
    assert!((position.seconds - (0.5 + 1.0 / f64::from(RATE))).abs() < 1e-9);
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
}

#[test]
fn decode_stall_reports_one_underrun_then_recovers() {
    let h = Harness::new(&[("a.wav", 0.5, 2.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.09);
    drain(&events);

    h.gate.stall();
    let mut starved = false;
    for _ in 0..50 {
        if render(&renderer, BLOCK_FRAMES).1 == RenderStatus::Underrun {
            starved = true;
            break;
        }
    }
    assert!(starved, "buffer never ran dry");
    for _ in 0..5 {
        let (block, status) = render(&renderer, BLOCK_FRAMES);
        assert_eq!(status, RenderStatus::Underrun);
        assert!(block.iter().all(|&s| s == 0.0));
    }
    assert_eq!(drain(&events), vec![PlayerEvent::BufferUnderrun]);

    h.gate.release();
    h.wait_buffered(0.05);
    let (block, status) = render(&renderer, BLOCK_FRAMES);
    assert_eq!(status, RenderStatus::Playing);
    block.iter().for_each(|&s| assert_close(s, 0.5));
    assert_eq!(h.engine.state(), PlaybackState::Playing);
    assert!(drain(&events).is_empty());
}

#[test]
fn priming_after_play_is_not_an_underrun() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    drain(&events);

    h.gate.stall();
    h.engine.play().unwrap();
    let (_, status) = render(&renderer, BLOCK_FRAMES);
    assert_eq!(status, RenderStatus::Buffering);
    assert!(drain(&events).is_empty());
    h.gate.release();
}

#[test]
fn gain_and_volume_apply_to_buffered_audio() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.09);

    h.engine.set_gain(a, 0.25).unwrap();
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.125));

    h.engine.set_volume(2.0).unwrap();
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.25));
    assert_eq!(h.engine.volume(), 2.0);

    assert!(matches!(
        h.engine.set_volume(f64::NAN),
        Err(PlaybackError::InvalidVolume(_))
    ));
    assert!(h.engine.set_volume(-1.0).is_err());
    assert_eq!(h.engine.volume(), 2.0);
}

#[test]
fn boosted_output_is_limited_to_full_scale() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    h.engine.insert(h.file("a.wav"), 4.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.05);

    let (block, _) = render(&renderer, BLOCK_FRAMES);
    block.iter().for_each(|&s| assert_close(s, 1.0));
}

// ===== Removal while playing =====

#[test]
fn removing_playing_item_continues_with_next() {
    let h = Harness::new(&[("a.wav", 0.3, 1.0), ("b.wav", 0.6, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.09);
    render(&renderer, BLOCK_FRAMES);
    drain(&events);

    let removed = h.engine.remove(a).unwrap();

    // The file is handed back, not closed
    assert!(removed.path().ends_with("a.wav"));
    assert!(removed.duration().is_some());
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    assert_eq!(h.engine.play_position(), Position::new(b, 0.0));

    h.wait_buffered(0.05);
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.6));
    assert!(drain(&events).is_empty());
}

#[test]
fn removing_last_item_goes_idle_until_insert() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0), ("b.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    let a = h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    h.wait_buffered(0.05);
    render(&renderer, BLOCK_FRAMES);
    drain(&events);

    h.engine.remove(a).unwrap();
    assert!(drain(&events).is_empty());
    assert_eq!(h.engine.play_position().item, None);
    assert_eq!(render(&renderer, BLOCK_FRAMES).1, RenderStatus::Idle);
    assert!(drain(&events).is_empty());

    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    assert_eq!(h.engine.play_position(), Position::new(b, 0.0));
}

#[test]
fn insert_before_decoded_ahead_item_plays_in_list_order() {
    let h = Harness::new(&[("a.wav", 0.5, 0.05), ("b.wav", 0.1, 1.0), ("c.wav", 0.9, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let c = h.engine.insert(h.file("c.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    wait_until("decode into c", || h.engine.decode_position().item == Some(c));

    let b = h.engine.insert(h.file("b.wav"), 1.0, Some(c)).unwrap();
    wait_until("decode into b", || {
        h.engine.decode_position().item == Some(b) && h.engine.buffered_seconds() >= 0.09
    });
    drain(&events);

    render(&renderer, 400);
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.1));
    assert_eq!(h.engine.play_position().item, Some(b));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
}

#[test]
fn insert_before_fully_buffered_item_plays_in_list_order() {
    let h = Harness::new(&[
        ("a.wav", 0.5, 0.05),
        ("b.wav", 0.1, 0.03),
        ("c.wav", 0.9, 0.05),
        ("x.wav", 0.3, 0.02),
    ]);
    let renderer = h.engine.renderer();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    let c = h.engine.insert(h.file("c.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    // b is short enough to be decoded completely before anything plays
    wait_until("decode into c", || h.engine.decode_position().item == Some(c));

    let x_file = h.file("x.wav");
    h.gate.stall();
    let x = h.engine.insert(x_file, 1.0, Some(b)).unwrap();
    assert_eq!(h.engine.decode_position(), Position::new(x, 0.0));
    assert!((h.engine.buffered_seconds() - 0.05).abs() < 1e-9);
    h.gate.release();

    let mut heard: Vec<f32> = Vec::new();
    for _ in 0..100 {
        wait_until("next block", || {
            h.engine.buffered_seconds() >= 0.0099 || h.engine.decode_position().item.is_none()
        });
        let (block, status) = render(&renderer, BLOCK_FRAMES);
        if status == RenderStatus::Idle {
            break;
        }
        if heard.last().map_or(true, |&last| (last - block[0]).abs() > 1e-3) {
            heard.push(block[0]);
        }
    }

    assert_eq!(heard.len(), 4, "heard {heard:?}");
    for (level, expected) in heard.iter().zip([0.5, 0.3, 0.1, 0.9]) {
        assert_close(*level, expected);
    }
}

#[test]
fn append_after_tail_was_decoded_is_played() {
    let h = Harness::new(&[("a.wav", 0.5, 0.05), ("b.wav", 0.7, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    wait_until("decode past tail", || h.engine.decode_position().item.is_none());
    drain(&events);

    let b_file = h.file("b.wav");
    h.gate.stall();
    let b = h.engine.insert(b_file, 1.0, None).unwrap();
    assert_eq!(h.engine.decode_position(), Position::new(b, 0.0));
    h.gate.release();
    h.wait_buffered(0.1);

    render(&renderer, 400);
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.7));
    assert_eq!(h.engine.play_position().item, Some(b));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
}

// ===== End of playlist and failures =====

#[test]
fn end_of_playlist_goes_idle_without_underrun() {
    let h = Harness::new(&[("a.wav", 0.5, 0.05), ("b.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();
    h.engine.play().unwrap();
    wait_until("decode past tail", || h.engine.decode_position().item.is_none());
    drain(&events);

    assert_eq!(render(&renderer, 400).1, RenderStatus::Playing);
    let (block, status) = render(&renderer, BLOCK_FRAMES);
    assert_eq!(status, RenderStatus::Idle);
    assert!(block.iter().all(|&s| s == 0.0));
    assert_eq!(h.engine.play_position().item, None);
    assert!(drain(&events).is_empty());

    // A fresh insert revives the engine
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    h.wait_buffered(0.05);
    assert_eq!(render(&renderer, BLOCK_FRAMES).1, RenderStatus::Playing);
    assert_eq!(h.engine.play_position().item, Some(b));
}

#[test]
fn undecodable_item_is_reported_and_skipped() {
    let h = Harness::new(&[("b.wav", 0.5, 1.0)]);
    let renderer = h.engine.renderer();
    let events = h.engine.events();
    let broken = h.engine.insert(h.file("broken.wav"), 1.0, None).unwrap();
    let b = h.engine.insert(h.file("b.wav"), 1.0, None).unwrap();
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);

    h.engine.play().unwrap();
    assert_eq!(
        events.wait_timeout(Duration::from_secs(5)).unwrap(),
        Some(PlayerEvent::DecodeFailed { item: broken })
    );

    h.wait_buffered(0.05);
    let (block, _) = render(&renderer, 1);
    block.iter().for_each(|&s| assert_close(s, 0.5));
    assert_eq!(drain(&events), vec![PlayerEvent::NowPlaying]);
    assert_eq!(h.engine.play_position().item, Some(b));
}

// ===== Events across threads =====

#[test]
fn wait_returns_when_another_thread_triggers_an_event() {
    let h = Harness::new(&[("a.wav", 0.5, 1.0)]);
    let events = h.engine.events();

    let waiter = thread::spawn(move || events.wait());
    thread::sleep(Duration::from_millis(20));
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();

    assert_eq!(waiter.join().unwrap().unwrap(), PlayerEvent::NowPlaying);
}

#[test]
fn dropping_engine_releases_waiters() {
    let h = Harness::new(&[]);
    let events = h.engine.events();
    assert!(!events.peek(false).unwrap());

    let waiter = thread::spawn(move || events.wait());
    thread::sleep(Duration::from_millis(20));
    drop(h.engine);

    assert!(matches!(
        waiter.join().unwrap(),
        Err(PlaybackError::EventChannelClosed)
    ));
}

// ===== Outputs and real decoding =====

#[test]
fn null_output_drives_playlist_to_the_end() {
    let h = Harness::new(&[("a.wav", 0.5, 0.1)]);
    h.engine.insert(h.file("a.wav"), 1.0, None).unwrap();

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let mut output = NullOutput::new(Duration::from_millis(5)).with_tap({
        let statuses = Arc::clone(&statuses);
        move |_, status| statuses.lock().unwrap().push(status)
    });
    output.start(h.engine.renderer()).unwrap();
    assert!(output.is_running());
    assert!(output.start(h.engine.renderer()).is_err());

    h.engine.play().unwrap();
    wait_until("end of playlist", || {
        statuses.lock().unwrap().contains(&RenderStatus::Idle)
    });
    output.stop().unwrap();

    assert!(!output.is_running());
    assert_eq!(h.engine.play_position().item, None);
    assert!(statuses.lock().unwrap().contains(&RenderStatus::Playing));
}

#[test]
fn real_wav_is_resampled_to_output_rate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 8000, 0.25, 2000);

    let config = PlaybackConfig {
        sample_rate: 16000,
        channels: 1,
        buffer_target_ms: 50,
        ..PlaybackConfig::default()
    };
    let engine = PlaybackEngine::new(config).unwrap();
    let renderer = engine.renderer();
    engine
        .insert(Arc::new(AudioFile::open(&path).unwrap()), 1.0, None)
        .unwrap();
    engine.play().unwrap();

    let mut played = Vec::new();
    loop {
        wait_until("decoded audio", || {
            engine.buffered_seconds() >= 0.01 - 1e-9 || engine.decode_position().item.is_none()
        });
        let (block, status) = render(&renderer, 160);
        match status {
            RenderStatus::Playing => played.extend(block),
            RenderStatus::Idle => break,
            _ => {}
        }
        assert!(played.len() < 16000, "never reached end of playlist");
    }

    // 0.25 s at 16 kHz plus resampler padding
    let blocks = played.len() / 160;
    assert!((20..=36).contains(&blocks), "played {blocks} blocks");
    let middle = played[played.len() / 4];
    assert!((middle - 0.25).abs() < 0.05, "middle sample {middle}");
}
