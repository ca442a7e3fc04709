//! Service configuration.
//!
//! Loaded from a JSON file in two stages: structural validation against
//! the embedded JSON Schema, then semantic checks on the deserialized
//! values. Every field has a default, so `{"version": "1.0"}` is a
//! complete config.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../schema/config-v1.json");

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_COPIES_MAX: u32 = 10;
const DEFAULT_RETENTION_DAYS: u32 = 7;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub version: String,

    /// SQLite database file. Defaults to
    /// `~/.printspool/data/printspool.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Root directory for submitted document bytes. Defaults to
    /// `~/.printspool/documents`.
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,

    /// Public base URL embedded in tracking tokens.
    #[serde(default = "default_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_copies_max")]
    pub copies_max: u32,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Days a printed job is retained before the sweeper removes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            documents_dir: None,
            public_base_url: default_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
            copies_max: default_copies_max(),
            rate_limit: RateLimitConfig::default(),
            retention_days: default_retention_days(),
        }
    }
}

impl ServiceConfig {
    /// Database file to open, falling back to the platform default.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }

    /// Document root to store bytes under, falling back to the platform
    /// default.
    pub fn documents_dir(&self) -> Option<PathBuf> {
        self.documents_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".printspool").join("documents")))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_copies_max() -> u32 {
    DEFAULT_COPIES_MAX
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_window_secs() -> u64 {
    3600
}

fn default_max_requests() -> u32 {
    100
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ServiceConfig, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: ServiceConfig = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| format!("{} at {}", e, e.instance_path()))
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !config.public_base_url.starts_with("http://")
        && !config.public_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!(
                "public_base_url must carry an http(s) scheme: '{}'",
                config.public_base_url
            ),
        });
    }

    if config.max_upload_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "max_upload_bytes must be positive".to_string(),
        });
    }

    if config.copies_max == 0 {
        return Err(ConfigError::Validation {
            message: "copies_max must be at least 1".to_string(),
        });
    }

    if config.rate_limit.window_secs == 0 {
        return Err(ConfigError::Validation {
            message: "rate_limit.window_secs must be positive".to_string(),
        });
    }

    if config.rate_limit.max_requests == 0 {
        return Err(ConfigError::Validation {
            message: "rate_limit.max_requests must be at least 1".to_string(),
        });
    }

    if config.retention_days == 0 {
        return Err(ConfigError::Validation {
            message: "retention_days must be at least 1".to_string(),
        });
    }

    Ok(())
}
