//! Domain types shared across Cadence crates

mod audio;

pub use audio::{AudioBuffer, AudioFormat, SampleRate};
