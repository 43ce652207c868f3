/// Collaborator traits consumed by the playback engine and the scan job
use crate::error::Result;
use crate::types::{AudioBuffer, AudioFormat};
use std::path::Path;
use std::time::Duration;

/// Audio decoder service
///
/// Turns a path into a streaming PCM source. Implementations are shared
/// between the playback worker and scan jobs, so `open` takes `&self` and
/// every opened stream carries its own decoding state.
pub trait AudioDecoder: Send + Sync {
    /// Open a file for streaming decode
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, probed, or has no audio track
    fn open(&self, path: &Path) -> Result<Box<dyn DecodeStream>>;

    /// Check if the decoder is expected to handle the given file
    fn supports_format(&self, path: &Path) -> bool {
        let _ = path;
        true
    }
}

/// An opened, decodable stream
///
/// Every buffer returned by `decode_next` uses the layout reported by `format`.
pub trait DecodeStream: Send {
    /// PCM layout of the buffers this stream produces
    fn format(&self) -> AudioFormat;

    /// Decode the next block of frames
    ///
    /// Returns `None` at end of stream.
    ///
    /// # Errors
    /// Returns an error if the underlying data cannot be decoded
    fn decode_next(&mut self) -> Result<Option<AudioBuffer>>;

    /// Seek to a position from the start of the stream
    ///
    /// Returns the position actually reached, which may differ from the request
    /// due to packet boundaries.
    ///
    /// # Errors
    /// Returns an error if the format does not support seeking
    fn seek(&mut self, position: Duration) -> Result<Duration>;

    /// Total duration, if the container reports one
    fn duration(&self) -> Option<Duration>;

    /// Position of the next frame `decode_next` will return
    fn position(&self) -> Duration;
}
