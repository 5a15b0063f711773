//! Hostpaths Configuration
//!
//! Handles parsing and management of hostpaths.toml configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name searched for by [`PathsConfig::find_and_load`]
pub const CONFIG_FILE_NAME: &str = "hostpaths.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching hostpaths.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Filesystem call parameters
    #[serde(default)]
    pub fs: FsConfig,

    /// Directory listing behaviour
    #[serde(default)]
    pub listing: ListingConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PathsConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parameters passed through to filesystem calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Mode for `make_file` (before umask)
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// Mode for `make_directory` (before umask)
    #[serde(default = "default_dir_mode")]
    pub dir_mode: u32,

    /// First `getcwd` buffer size; doubled until the path fits
    #[serde(default = "default_cwd_capacity")]
    pub cwd_initial_capacity: usize,
}

fn default_file_mode() -> u32 {
    0o666
}

fn default_dir_mode() -> u32 {
    0o777
}

fn default_cwd_capacity() -> usize {
    256
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            file_mode: default_file_mode(),
            dir_mode: default_dir_mode(),
            cwd_initial_capacity: default_cwd_capacity(),
        }
    }
}

/// Directory listing behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Capacity a fresh listing starts with
    #[serde(default = "default_listing_capacity")]
    pub initial_capacity: usize,

    /// Keep `.` and `..` in listings
    #[serde(default)]
    pub include_dot_entries: bool,
}

fn default_listing_capacity() -> usize {
    4
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_listing_capacity(),
            include_dot_entries: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
