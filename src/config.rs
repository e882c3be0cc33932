//! Configuration file parser for ~/.config/tidings/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged, since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheOptions, DEFAULT_CAPACITY};
use crate::feed::TimelineOrder;
use crate::storage;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of feeds held in the cache.
    pub cache_size: usize,

    /// Hours a fetched feed is served from cache before it is refetched.
    pub cache_duration_hours: u64,

    /// Never touch the network; serve only what is cached.
    pub offline: bool,

    /// Direction of the aggregated timeline and the downloads list.
    pub timeline_order: TimelineOrder,

    /// Override for the cache document location.
    pub cache_path: Option<PathBuf>,

    /// Override for the read-status file location.
    pub read_status_path: Option<PathBuf>,

    /// Feed URLs shown when none are given on the command line.
    pub feeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CAPACITY,
            cache_duration_hours: 24,
            offline: false,
            timeline_order: TimelineOrder::default(),
            cache_path: None,
            read_status_path: None,
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "cache_size",
        "cache_duration_hours",
        "offline",
        "timeline_order",
        "cache_path",
        "read_status_path",
        "feeds",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid pulling a huge file into memory.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            cache_size = config.cache_size,
            cache_duration_hours = config.cache_duration_hours,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Cache construction settings derived from this config.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            capacity: self.cache_size,
            ttl: Duration::from_secs(self.cache_duration_hours.saturating_mul(3600)),
            offline: self.offline,
            order: self.timeline_order,
        }
    }

    /// Configured cache document path, falling back to the user cache dir.
    pub fn cache_file(&self) -> Option<PathBuf> {
        self.cache_path.clone().or_else(storage::default_cache_path)
    }

    /// Configured read-status path, falling back to the user cache dir.
    pub fn read_status_file(&self) -> Option<PathBuf> {
        self.read_status_path
            .clone()
            .or_else(storage::default_read_status_path)
    }
}

/// Default config location: `<user config dir>/tidings/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("tidings").join("config.toml"))
}

// ============================================================================
// Tests
// ============================================================================
