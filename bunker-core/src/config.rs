use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Algorithm used to produce a consistent copy of the source database.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// `VACUUM INTO`: fast and defragmented, but holds a read lock that
    /// blocks writers for the whole copy.
    #[default]
    Vacuum,
    /// Incremental backup-API copy: slower, but each step is a short bounded
    /// critical section, safe for continuously-written sources.
    Online,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Vacuum => f.write_str("vacuum"),
            Strategy::Online => f.write_str("online"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source_path: PathBuf,
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_pages_per_step")]
    pub pages_per_step: u32,
    #[serde(default = "default_sleep_interval", with = "humantime_serde")]
    pub sleep_interval: Duration,
    #[serde(default = "default_progress_log_interval", with = "humantime_serde")]
    pub progress_log_interval: Duration,
}

fn default_pages_per_step() -> u32 {
    100
}

fn default_sleep_interval() -> Duration {
    Duration::from_millis(10)
}

fn default_progress_log_interval() -> Duration {
    Duration::from_secs(15)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("invalid configuration string")]
    InvalidConfigString(String, #[source] eyre::Report),
    #[error("invalid configuration file {}", .0.display())]
    InvalidConfigFile(PathBuf, #[source] eyre::Report),
    #[error("i/o error reading configuration file {}", .0.display())]
    IoError(PathBuf, std::io::Error),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("source_path must not be empty")]
    EmptySourcePath,
    #[error("backup_dir must not be empty")]
    EmptyBackupDir,
    #[error("pages_per_step must be positive for the online strategy, but was {0}")]
    InvalidPagesPerStep(u32),
    #[error("progress_log_interval must be a positive duration for the online strategy")]
    InvalidProgressLogInterval,
}

impl Config {
    pub fn parse(s: &str) -> Result<Config, ConfigLoadError> {
        toml::from_str(s).map_err(|e| ConfigLoadError::InvalidConfigString(s.to_owned(), e.into()))
    }

    pub async fn parse_file(p: &Path) -> Result<Config, ConfigLoadError> {
        let config_string = tokio::fs::read_to_string(p)
            .await
            .map_err(|e| ConfigLoadError::IoError(p.to_owned(), e))?;
        toml::from_str(&config_string)
            .map_err(|e| ConfigLoadError::InvalidConfigFile(p.to_owned(), e.into()))
    }

    /// Checks invariants that the type system can't express. Runs before any
    /// I/O; a backup run with an invalid configuration creates no files.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptySourcePath);
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyBackupDir);
        }
        if self.strategy == Strategy::Online {
            if self.pages_per_step == 0 {
                return Err(ConfigError::InvalidPagesPerStep(self.pages_per_step));
            }
            if self.progress_log_interval.is_zero() {
                return Err(ConfigError::InvalidProgressLogInterval);
            }
        }
        Ok(())
    }
}
