/// CPAL-based audio output driving a playback engine renderer
use crate::error::{AudioOutputError, Result};
use cadence_playback::{AudioOutput, PlaybackConfig, Renderer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Commands sent to the audio thread
enum AudioCommand {
    /// Build a stream that pulls from `renderer` and start it
    Start {
        renderer: Renderer,
        reply: Sender<Result<()>>,
    },
    /// Drop the current stream
    Stop,
    /// Drop the stream and exit
    Shutdown,
}

/// CPAL audio output
///
/// **Architecture**: a dedicated audio thread owns the CPAL `Stream` (which
/// is not `Send` on every platform). The output talks to it over a channel;
/// the stream callback calls [`Renderer::render`] directly.
pub struct CpalOutput {
    command_tx: Sender<AudioCommand>,
    device_name: String,
    sample_rate: u32,
    channels: u16,
    running: bool,
    audio_thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for CpalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalOutput")
            .field("device", &self.device_name)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl CpalOutput {
    /// Open the default output device
    ///
    /// # Errors
    /// Returns an error if no audio device is found or configuration fails
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioOutputError::DeviceNotFound)?;
        Self::with_device(device)
    }

    /// Open the output device with the given name
    pub fn with_device_name(name: &str) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|n| n == name))
            .ok_or_else(|| AudioOutputError::NamedDeviceNotFound(name.to_string()))?;
        Self::with_device(device)
    }

    /// Names of the available output devices
    pub fn device_names() -> Result<Vec<String>> {
        let host = cpal::default_host();
        Ok(host
            .output_devices()?
            .filter_map(|device| device.name().ok())
            .collect())
    }

    fn with_device(device: Device) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        if !matches!(sample_format, SampleFormat::F32 | SampleFormat::I16) {
            return Err(AudioOutputError::UnsupportedFormat(format!("{:?}", sample_format)));
        }

        let sample_rate = supported.sample_rate();
        let config = supported.config();
        let channels = config.channels;

        let (command_tx, command_rx) = bounded::<AudioCommand>(8);
        let audio_thread = thread::Builder::new()
            .name("cadence-audio".to_string())
            .spawn(move || Self::audio_thread_run(device, config, sample_format, command_rx))?;

        info!(
            "Opened output '{}' ({} Hz, {} ch, {:?})",
            device_name, sample_rate, channels, sample_format
        );

        Ok(Self {
            command_tx,
            device_name,
            sample_rate,
            channels,
            running: false,
            audio_thread: Some(audio_thread),
        })
    }

    /// Device name
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Device sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Device channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// `base` with rate and channels matched to this device
    pub fn playback_config(&self, base: PlaybackConfig) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            ..base
        }
    }

    /// Audio thread main loop; owns the stream
    fn audio_thread_run(
        device: Device,
        config: StreamConfig,
        sample_format: SampleFormat,
        command_rx: Receiver<AudioCommand>,
    ) {
        let mut stream: Option<Stream> = None;

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                AudioCommand::Start { renderer, reply } => {
                    stream = None;
                    let result = Self::build_stream(&device, &config, sample_format, renderer)
                        .and_then(|s| {
                            s.play()?;
                            Ok(s)
                        });
                    let reply_result = match result {
                        Ok(s) => {
                            stream = Some(s);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(reply_result);
                }
                AudioCommand::Stop => {
                    if stream.take().is_some() {
                        debug!("Output stream dropped");
                    }
                }
                AudioCommand::Shutdown => break,
            }
        }
        drop(stream);
        debug!("Audio thread exiting");
    }

    fn build_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        renderer: Renderer,
    ) -> Result<Stream> {
        let on_error = |err: cpal::StreamError| error!("Audio stream error: {}", err);

        let stream = match sample_format {
            SampleFormat::I16 => {
                let mut scratch = Vec::new();
                device.build_output_stream(
                    config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0.0_f32);
                        renderer.render(&mut scratch);
                        for (out, sample) in data.iter_mut().zip(&scratch) {
                            *out = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                        }
                    },
                    on_error,
                    None,
                )?
            }
            _ => device.build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render(data);
                },
                on_error,
                None,
            )?,
        };
        Ok(stream)
    }
}

impl AudioOutput for CpalOutput {
    fn start(&mut self, renderer: Renderer) -> cadence_playback::Result<()> {
        if renderer.sample_rate() != self.sample_rate || renderer.channels() != self.channels {
            return Err(AudioOutputError::FormatMismatch {
                renderer_rate: renderer.sample_rate(),
                renderer_channels: renderer.channels(),
                device_rate: self.sample_rate,
                device_channels: self.channels,
            }
            .into());
        }

        let (reply, result) = bounded(1);
        self.command_tx
            .send(AudioCommand::Start { renderer, reply })
            .map_err(|_| AudioOutputError::ThreadGone)?;
        result.recv().map_err(|_| AudioOutputError::ThreadGone)??;

        self.running = true;
        debug!("Output started on '{}'", self.device_name);
        Ok(())
    }

    fn stop(&mut self) -> cadence_playback::Result<()> {
        if !self.running {
            return Ok(());
        }
        self.command_tx
            .send(AudioCommand::Stop)
            .map_err(|_| AudioOutputError::ThreadGone)?;
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                warn!("Audio thread panicked");
            }
        }
    }
}
