//! Sample-rate and channel adaptation of decoded streams
//!
//! Decoders deliver interleaved stereo at the file's native rate. The engine
//! buffers audio at the output rate and channel count, so each stream gets a
//! `StreamResampler` when its rate differs. Input that does not fill a whole
//! resampler chunk is held back until the next block or `flush`.

use crate::error::{PlaybackError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Chunk length as a fraction of the input rate (0.05 s)
const CHUNK_DIVISOR: u32 = 20;

/// Streaming sinc resampler over interleaved stereo input
pub struct StreamResampler {
    resampler: SincFixedIn<f32>,
    pending: [Vec<f32>; 2],
}

impl std::fmt::Debug for StreamResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamResampler")
            .field("pending_frames", &self.pending[0].len())
            .finish_non_exhaustive()
    }
}

impl StreamResampler {
    /// Create a resampler, or `None` when the rates already match
    pub fn for_rates(from_hz: u32, to_hz: u32) -> Result<Option<Self>> {
        if from_hz == to_hz {
            return Ok(None);
        }

        let params = SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };
        let chunk_frames = (from_hz / CHUNK_DIVISOR).max(64) as usize;

        let resampler = SincFixedIn::<f32>::new(
            f64::from(to_hz) / f64::from(from_hz),
            2.0,
            params,
            chunk_frames,
            2,
        )
        .map_err(|e| PlaybackError::Resample(format!("Failed to create resampler: {}", e)))?;

        debug!("Resampling {} Hz -> {} Hz", from_hz, to_hz);
        Ok(Some(Self {
            resampler,
            pending: [Vec::new(), Vec::new()],
        }))
    }

    /// Feed interleaved stereo, returning whatever whole chunks produced
    pub fn process(&mut self, interleaved: &[f32]) -> Result<Vec<f32>> {
        for frame in interleaved.chunks_exact(2) {
            self.pending[0].push(frame[0]);
            self.pending[1].push(frame[1]);
        }

        let mut out = Vec::new();
        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let chunk = [
                self.pending[0].drain(..needed).collect::<Vec<_>>(),
                self.pending[1].drain(..needed).collect::<Vec<_>>(),
            ];
            let resampled = self
                .resampler
                .process(&chunk[..], None)
                .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            interleave_into(&resampled, &mut out);
        }
        Ok(out)
    }

    /// Resample the held-back tail at end of stream
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let mut out = Vec::new();
        if self.pending[0].is_empty() {
            return Ok(out);
        }
        let chunk = [
            std::mem::take(&mut self.pending[0]),
            std::mem::take(&mut self.pending[1]),
        ];
        let resampled = self
            .resampler
            .process_partial(Some(&chunk[..]), None)
            .map_err(|e| PlaybackError::Resample(e.to_string()))?;
        interleave_into(&resampled, &mut out);
        Ok(out)
    }
}

fn interleave_into(planar: &[Vec<f32>], out: &mut Vec<f32>) {
    if let [left, right, ..] = planar {
        out.reserve(left.len() * 2);
        for (l, r) in left.iter().zip(right) {
            out.push(*l);
            out.push(*r);
        }
    }
}

/// Map interleaved stereo onto the output channel count
///
/// Mono output averages both sides; extra channels past two are silent.
pub fn fit_channels(stereo: Vec<f32>, channels: u16) -> Vec<f32> {
    match channels {
        2 => stereo,
        1 => stereo
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect(),
        n => {
            let n = usize::from(n);
            let mut out = Vec::with_capacity(stereo.len() / 2 * n);
            for frame in stereo.chunks_exact(2) {
                out.push(frame[0]);
                out.push(frame[1]);
                out.extend(std::iter::repeat(0.0).take(n - 2));
            }
            out
        }
    }
}
