//! Process-wide initialization and diagnostic verbosity
//!
//! Cadence logs through `tracing`. `init()` installs a global subscriber whose
//! level can be switched at runtime with `set_log_level`. Hosts that install
//! their own subscriber first keep it; Cadence then only emits events and
//! `set_log_level` reports that it has nothing to control.
//!
//! The level only changes what is printed, never control flow.

use crate::error::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

/// Diagnostic verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Print nothing
    #[default]
    Quiet,
    /// Errors only
    Error,
    /// Errors and warnings (underruns, evicted events)
    Warning,
    /// State changes and scan summaries
    Info,
    /// Buffer and stream lifecycle
    Debug,
}

impl LogLevel {
    fn as_filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warning => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Info,
            4 => Self::Debug,
            _ => Self::Quiet,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Quiet => 0,
            Self::Error => 1,
            Self::Warning => 2,
            Self::Info => 3,
            Self::Debug => 4,
        }
    }
}

type LevelHandle = reload::Handle<LevelFilter, Registry>;

/// `None` when another subscriber was already installed
static SUBSCRIBER: OnceLock<Option<LevelHandle>> = OnceLock::new();

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(0);

/// One-time global initialization
///
/// Must be called before any other Cadence operation. Calling it again is a
/// no-op.
pub fn init() {
    SUBSCRIBER.get_or_init(|| {
        let level = log_level();
        let (filter, handle) = reload::Layer::new(level.as_filter());
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .is_ok();
        installed.then_some(handle)
    });
}

/// Change the diagnostic verbosity
///
/// # Errors
/// Returns an error if `init()` has not run, or if a host-installed subscriber
/// owns the global dispatcher.
pub fn set_log_level(level: LogLevel) -> Result<()> {
    CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);

    match SUBSCRIBER.get() {
        Some(Some(handle)) => handle
            .modify(|filter| *filter = level.as_filter())
            .map_err(|e| CadenceError::Other(format!("Failed to change log level: {e}"))),
        Some(None) => Err(CadenceError::Other(
            "A global tracing subscriber was installed by the host".to_string(),
        )),
        None => Err(CadenceError::Other("cadence_core::init() has not been called".to_string())),
    }
}

/// The most recently requested verbosity
pub fn log_level() -> LogLevel {
    LogLevel::from_u8(CURRENT_LEVEL.load(Ordering::Relaxed))
}
