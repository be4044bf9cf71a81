use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log directives, e.g. `cubik=debug`
pub const LOG_ENV: &str = "CUBIK_LOG";
pub const LOG_FILE: &str = "cubik.log";
const DEFAULT_LEVELS: &str = "warn";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("bad logging directives '{0}'")]
    Directives(String),
    #[error("cannot create log directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging already initialised: {0}")]
    Init(String),
}

/// File logging setup. The terminal belongs to the UI, so nothing goes to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "struct unused - invoke apply()"]
pub struct LoggingSystem {
    dir: PathBuf,
    levels: String,
}

impl LoggingSystem {
    pub fn new<P: AsRef<Path>>(dir: P, levels: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            levels: levels.to_string(),
        }
    }

    /// Levels from `CUBIK_LOG`, falling back to `warn`
    pub fn from_env<P: AsRef<Path>>(dir: P) -> Self {
        let levels = std::env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_LEVELS.to_string());
        Self::new(dir, &levels)
    }

    pub fn levels(&self) -> &str {
        &self.levels
    }

    pub fn logfile(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.levels)
            .map_err(|_| LoggingError::Directives(self.levels.clone()))
    }

    /// Install the global subscriber. Only the first call in a process succeeds.
    pub fn apply(self) -> Result<(), LoggingError> {
        let filter = self.filter()?;
        std::fs::create_dir_all(&self.dir)?;
        let file = RollingFileAppender::new(Rotation::NEVER, &self.dir, LOG_FILE);

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .with_target(false)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        tracing::debug!(
            logfile = %self.logfile().display(),
            levels = %self.levels,
            "logging started"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_keeps_levels_and_logfile() {
        let system = LoggingSystem::new("/tmp/cubik", "cubik=debug");

        assert_eq!(system.levels(), "cubik=debug");
        assert_eq!(system.logfile(), PathBuf::from("/tmp/cubik/cubik.log"));
        assert!(system.filter().is_ok());
    }

    #[test]
    fn test_apply_writes_to_the_log_file() {
        let dir = tempdir().unwrap();
        let system = LoggingSystem::new(dir.path().join("state"), "info");
        let logfile = system.logfile();

        system.apply().unwrap();
        tracing::info!("solve session opened");

        let contents = std::fs::read_to_string(logfile).unwrap();
        assert!(contents.contains("solve session opened"));

        // a second subscriber is refused
        assert!(matches!(
            LoggingSystem::new(dir.path(), "info").apply(),
            Err(LoggingError::Init(_))
        ));
    }
}
