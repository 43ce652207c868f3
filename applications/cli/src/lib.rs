//! Cadence command-line player and ReplayGain scanner
//!
//! The binary is a thin clap front-end; the subcommands live here so they can
//! be tested without a terminal or an audio device.

pub mod commands;
pub mod config;
pub mod error;

pub use config::CliConfig;
pub use error::{CliError, Result};
