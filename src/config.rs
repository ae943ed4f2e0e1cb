//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::storage::DuplicatePolicy;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// How repeated timestamps within one series are reduced
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("plantdb").join("plant.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./plant.db".to_string())
}

fn default_busy_timeout() -> u64 {
    5000
}

impl DatabaseConfig {
    /// Database path with a leading `~/` expanded to the home directory
    pub fn resolved_path(&self) -> PathBuf {
        match (self.path.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.path),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8050
}

impl ApiConfig {
    /// Socket address to bind
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad listen address {}:{}", self.host, self.port)))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
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
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
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

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from an explicit path, else the default locations, else the environment
    ///
    /// An explicit path that fails to load is an error; a default location
    /// that fails is skipped with a warning.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("plantdb").join("config.toml")),
            Some(PathBuf::from("/etc/plantdb/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `PLANTDB_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        // Database overrides
        if let Some(path) = lookup("PLANTDB_DB_PATH") {
            self.database.path = path;
        }
        if let Some(policy) = lookup("PLANTDB_DUPLICATE_POLICY") {
            self.database.duplicate_policy = policy
                .parse()
                .map_err(|e: crate::storage::StoreError| ConfigError::Invalid(e.to_string()))?;
        }

        // API overrides
        if let Some(host) = lookup("PLANTDB_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("PLANTDB_API_PORT") {
            self.api.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PLANTDB_API_PORT is not a port: '{}'", port)))?;
        }

        // Logging overrides
        if let Some(level) = lookup("PLANTDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PLANTDB_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# plantdb configuration
#
# Environment variables override these settings:
# - PLANTDB_DB_PATH
# - PLANTDB_DUPLICATE_POLICY
# - PLANTDB_API_HOST
# - PLANTDB_API_PORT
# - PLANTDB_LOG_LEVEL
# - PLANTDB_LOG_FORMAT

[database]
# SQLite database file (created on first use)
path = "~/.local/share/plantdb/plant.db"

# How long a connection waits on a locked database (ms)
busy_timeout_ms = 5000

# Reduction of repeated timestamps within a series: last, mean or reject
duplicate_policy = "last"

[api]
# API server host
host = "127.0.0.1"

# API server port
port = 8050

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
