//! Configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment:
//! `DW_DATA_ROOT`, `DW_USER_DATA_FOLDER`, `DW_LOG`, `DW_LOG_JSON`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive
    pub filter: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Concordance defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcordanceConfig {
    /// Page size when a request gives none
    pub default_page_size: usize,
}

impl Default for ConcordanceConfig {
    fn default() -> Self {
        Self { default_page_size: 20 }
    }
}

/// DocWorkspace configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of all persisted data
    pub data_root: PathBuf,
    /// Folder under `data_root` holding per-user folders
    pub user_data_folder: String,
    /// Rows evaluated to validate a cast before applying it
    pub sample_rows: usize,
    /// Logging
    pub log: LogConfig,
    /// Concordance defaults
    pub concordance: ConcordanceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            user_data_folder: "users".to_string(),
            sample_rows: 50,
            log: LogConfig::default(),
            concordance: ConcordanceConfig::default(),
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

impl Config {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With data root
    #[must_use]
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    /// With user data folder
    #[must_use]
    pub fn with_user_data_folder(mut self, folder: impl Into<String>) -> Self {
        self.user_data_folder = folder.into();
        self
    }

    /// With cast validation sample size
    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    /// With logging configuration
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Folder holding every user's folder
    #[must_use]
    pub fn users_root(&self) -> PathBuf {
        self.data_root.join(&self.user_data_folder)
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for invalid TOML or field types.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a file (or defaults) and apply environment overrides
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `DW_*` overrides from a lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup("DW_DATA_ROOT") {
            self.data_root = PathBuf::from(root);
        }
        if let Some(folder) = lookup("DW_USER_DATA_FOLDER") {
            self.user_data_folder = folder;
        }
        if let Some(filter) = lookup("DW_LOG") {
            self.log.filter = filter;
        }
        if let Some(json) = lookup("DW_LOG_JSON") {
            self.log.json = truthy(&json);
        }
        self
    }
}
