//! Configuration system for gridbus.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $GRIDBUS_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/gridbus/config.toml
//!   3. ~/.config/gridbus/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::chunk::DEFAULT_BUCKET;

/// Default bus address. Chunk saves go to `<address>/saveChunk`.
pub const DEFAULT_ADDRESS: &str = "gridfs";

/// Default HTTP port for the API adapter.
pub const DEFAULT_API_PORT: u16 = 9101;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridbusConfig {
    pub bus: BusConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Base address the GridFS handler registers under.
    pub address: String,
    /// Bucket used when a request omits one.
    pub default_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for `fs`, database file for `sqlite`. Ignored by `memory`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Fs,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Port on 127.0.0.1. 0 = OS-assigned.
    pub port: u16,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            default_bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            path: data_dir().join("chunks"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_API_PORT,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Fs => "fs",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "fs" => Ok(StorageBackend::Fs),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("gridbus")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("gridbus")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl GridbusConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            GridbusConfig::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a config file without applying env overrides.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("GRIDBUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&GridbusConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply GRIDBUS_* overrides. `lookup` resolves a variable name.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GRIDBUS_BUS__ADDRESS") {
            self.bus.address = v;
        }
        if let Some(v) = lookup("GRIDBUS_BUS__DEFAULT_BUCKET") {
            self.bus.default_bucket = v;
        }
        if let Some(v) = lookup("GRIDBUS_STORAGE__BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = lookup("GRIDBUS_STORAGE__PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GRIDBUS_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        Ok(())
    }
}
