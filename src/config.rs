//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::remote::ImgflipConfig;
use crate::storage::{FileBackend, KeyValueBackend, MemeStore, MemoryBackend, StoreConfig, StoreResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which medium backs the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Memory,
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Byte quota for the memory backend
    pub quota_bytes: Option<usize>,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("memeverse").to_string_lossy().to_string())
        .unwrap_or_else(|| "./memeverse_data".to_string())
}

fn default_key_prefix() -> String {
    "memeverse_".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
            key_prefix: default_key_prefix(),
            quota_bytes: None,
        }
    }
}

impl StorageConfig {
    /// Data directory with a leading `~` expanded to the home directory
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    /// Open the configured backend and wrap it in a store
    pub fn open_store(&self) -> StoreResult<MemeStore> {
        let backend: Arc<dyn KeyValueBackend> = match self.backend {
            BackendKind::File => Arc::new(FileBackend::open(self.data_path())?),
            BackendKind::Memory => match self.quota_bytes {
                Some(bytes) => Arc::new(MemoryBackend::with_quota(bytes)),
                None => Arc::new(MemoryBackend::new()),
            },
        };
        Ok(MemeStore::with_config(
            backend,
            StoreConfig::new(self.key_prefix.clone()),
        ))
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

/// Remote meme catalog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_api_url() -> String {
    "https://api.imgflip.com".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            username: String::new(),
            password: String::new(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl RemoteConfig {
    pub fn client_config(&self) -> ImgflipConfig {
        ImgflipConfig {
            base_url: self.base_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("memeverse").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Storage overrides
        if let Some(data_dir) = lookup("MEMEVERSE_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(prefix) = lookup("MEMEVERSE_KEY_PREFIX") {
            self.storage.key_prefix = prefix;
        }

        // Remote overrides
        if let Some(url) = lookup("MEMEVERSE_API_URL") {
            self.remote.base_url = url;
        }
        if let Some(username) = lookup("MEMEVERSE_IMGFLIP_USERNAME") {
            self.remote.username = username;
        }
        if let Some(password) = lookup("MEMEVERSE_IMGFLIP_PASSWORD") {
            self.remote.password = password;
        }

        // Logging overrides
        if let Some(level) = lookup("MEMEVERSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MEMEVERSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    let data_dir = toml::Value::String(default_data_dir());
    format!(
        r#"# Memeverse Configuration
#
# Environment variables override these settings:
# - MEMEVERSE_DATA_DIR
# - MEMEVERSE_KEY_PREFIX
# - MEMEVERSE_API_URL
# - MEMEVERSE_IMGFLIP_USERNAME
# - MEMEVERSE_IMGFLIP_PASSWORD
# - MEMEVERSE_LOG_LEVEL
# - MEMEVERSE_LOG_FORMAT

[storage]
# Directory holding one JSON file per storage key (a leading ~ is expanded)
data_dir = {data_dir}

# Storage medium: file or memory
backend = "file"

# Prefix for every storage key
key_prefix = "memeverse_"

# Byte quota (memory backend only)
# quota_bytes = 5242880

[remote]
# Meme catalog API
base_url = "https://api.imgflip.com"

# Imgflip account, needed only for captioning
username = ""
password = ""

# Request timeout in milliseconds
request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/memeverse/memeverse.log"
"#
    )
}
