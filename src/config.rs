use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::app_dirs::AppDirs;
use crate::clock::DEFAULT_INTERVAL_MS;
use crate::format::{TimeFormat, TimeFormatOverride};
use crate::scramble::DEFAULT_SCRAMBLE_LENGTH;
use crate::session::SessionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tick interval must be at least 1 ms")]
    InvalidInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub interval_ms: u64,
    pub scramble_length: usize,
    /// Layered over the built-in stopwatch format
    #[serde(skip_serializing_if = "TimeFormatOverride::is_empty")]
    pub time_format: TimeFormatOverride,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            scramble_length: DEFAULT_SCRAMBLE_LENGTH,
            time_format: TimeFormatOverride::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(())
    }

    pub fn time_format(&self) -> TimeFormat {
        TimeFormat::default().with_override(&self.time_format)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            interval: Duration::from_millis(self.interval_ms),
            scramble_length: self.scramble_length,
            time_format: self.time_format(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// A missing file means defaults; anything unreadable is an error
    fn load(&self) -> Result<Config, ConfigError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };
        let cfg: Config = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        tracing::info!(path = %self.path.display(), ?cfg, "config loaded");
        Ok(cfg)
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
