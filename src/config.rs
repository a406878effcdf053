//! Database configuration
//!
//! Read from a JSON file. Only `data_dir` is required:
//!
//! ```json
//! { "data_dir": "./data", "sync_writes": true, "checkpoint_on_close": true, "log_level": "info" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Data directory (required)
    pub data_dir: PathBuf,

    /// fsync after every append (default: true)
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,

    /// Reconcile every table when the database closes (default: true)
    #[serde(default = "default_checkpoint_on_close")]
    pub checkpoint_on_close: bool,

    /// Lowest severity logged: trace, info, warn, error or fatal (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sync_writes() -> bool {
    true
}

fn default_checkpoint_on_close() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl DbConfig {
    /// Config for `data_dir` with every other field at its default.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync_writes: default_sync_writes(),
            checkpoint_on_close: default_checkpoint_on_close(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DbConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".to_string()));
        }
        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level {:?}",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Configured log threshold; `Info` if the level does not parse.
    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("tables")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history").join("history.dat")
    }
}
