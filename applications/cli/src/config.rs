/// CLI configuration
use crate::error::{CliError, Result};
use cadence_core::LogLevel;
use cadence_loudness::ScanConfig;
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub output: OutputSettings,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            scan: ScanConfig::default(),
            output: OutputSettings::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Output device name; the system default when unset
    #[serde(default)]
    pub device: Option<String>,

    /// Prefer album over track ReplayGain when both are tagged
    #[serde(default = "default_prefer_album_gain")]
    pub prefer_album_gain: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            device: None,
            prefer_album_gain: default_prefer_album_gain(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Warning
}

fn default_prefer_album_gain() -> bool {
    true
}

impl CliConfig {
    /// Load configuration from a file and the environment
    ///
    /// `path` must exist when given; otherwise `cadence.toml` in the working
    /// directory is used if present. `CADENCE_*` variables override both,
    /// with `__` separating sections (e.g. `CADENCE_PLAYBACK__BUFFER_TARGET_MS`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if !(self.scan.progress_interval_secs.is_finite() && self.scan.progress_interval_secs > 0.0)
        {
            return Err(CliError::Config(format!(
                "scan.progress_interval_secs must be positive, got {}",
                self.scan.progress_interval_secs
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.playback.buffer_target_ms, 200);
        assert!(config.output.prefer_album_gain);
        assert_eq!(config.log_level, LogLevel::Warning);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cadence.toml");
        fs::write(
            &path,
            r#"
log_level = "debug"

[playback]
buffer_target_ms = 500
initial_volume = 0.5

[scan]
progress_interval_secs = 0.5

[output]
prefer_album_gain = false
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.playback.buffer_target_ms, 500);
        assert_eq!(config.playback.sample_rate, 44100);
        assert_eq!(config.playback.initial_volume, 0.5);
        assert_eq!(config.scan.progress_interval_secs, 0.5);
        assert!(!config.output.prefer_album_gain);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = CliConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[playback]\nbuffer_target_ms = 0\n").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }
}
