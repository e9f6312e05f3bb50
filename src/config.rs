//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\jukebox\config.toml
//! - macOS: ~/Library/Application Support/jukebox/config.toml
//! - Linux: ~/.config/jukebox/config.toml
//!
//! The config file is human-readable and editable. It carries the storage
//! location and the list of remote indexes to synchronize with.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where manifests, downloads and caches live
    pub storage: StorageConfig,

    /// Remote index settings
    pub indexes: IndexConfig,
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for everything this crate writes
    pub data_dir: PathBuf,

    /// Directory holding the host's original audio files
    pub host_audio_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local"))
            .join("jukebox");
        Self {
            host_audio_dir: data_dir.join("host-audio"),
            data_dir,
        }
    }
}

impl StorageConfig {
    /// Per-track manifest directory
    pub fn manifests_dir(&self) -> PathBuf {
        self.data_dir.join("manifests")
    }

    /// Destination for downloaded audio
    pub fn songs_dir(&self) -> PathBuf {
        self.data_dir.join("songs")
    }

    /// Raw index responses, one file per index URL
    pub fn index_cache_dir(&self) -> PathBuf {
        self.data_dir.join("indexes-cache")
    }

    /// Persisted index id -> name map
    pub fn index_names_path(&self) -> PathBuf {
        self.data_dir.join("index-names.json")
    }

    /// Storage rooted at a single directory (tests, portable installs).
    pub fn rooted_at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_dir: dir.to_path_buf(),
            host_audio_dir: dir.join("host-audio"),
        }
    }
}

/// One configured remote index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSource {
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl IndexSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Remote index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Per-request timeout for index and song fetches
    pub fetch_timeout_secs: u64,

    /// Parse the last cached response when an index can't be fetched
    pub fallback_to_cache: bool,

    /// Indexes in priority order
    pub sources: Vec<IndexSource>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            fallback_to_cache: false,
            sources: Vec::new(),
        }
    }
}

impl IndexConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Provider of the configured index list.
///
/// The list is owned by whoever manages settings; the sync engine only
/// reads it at the start of every pass.
pub trait IndexSettings: Send + Sync {
    fn index_sources(&self) -> Vec<IndexSource>;
}

impl IndexSettings for IndexConfig {
    fn index_sources(&self) -> Vec<IndexSource> {
        self.sources.clone()
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jukebox"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
///
/// Returns default config if file doesn't exist or can't be parsed.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from a specific file
///
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
