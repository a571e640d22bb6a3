//! TOML-based configuration for sqlviz.
//!
//! Supports a config file (sqlviz.toml) with environment variable expansion
//! in paths.
//!
//! Example configuration:
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [storage]
//! app_db = "${HOME}/.local/share/sqlviz/app.db"
//!
//! [limits]
//! default_page_size = 10
//! max_page_size = 1000
//! default_sample_size = 100
//! max_sample_size = 1000
//! preview_rows = 1000
//! export_rows = 100000
//! query_timeout_ms = 5000
//!
//! [cache]
//! max_connections = 16
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::QueryLimits;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SQLVIZ_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub limits: LimitSettings,
    pub cache: CacheSettings,
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Where the application's own database lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the app store (supports ${ENV_VAR} expansion).
    pub app_db: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            app_db: "sqlviz_app.db".to_string(),
        }
    }
}

/// Result-size caps and the per-query deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub default_sample_size: u32,
    pub max_sample_size: u32,
    /// Rows fetched for a chart preview.
    pub preview_rows: u32,
    /// Rows written by a CSV export.
    pub export_rows: u32,
    pub query_timeout_ms: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 1000,
            default_sample_size: 100,
            max_sample_size: 1000,
            preview_rows: 1000,
            export_rows: 100_000,
            query_timeout_ms: 5000,
        }
    }
}

impl LimitSettings {
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            default_sample_size: self.default_sample_size,
            max_sample_size: self.max_sample_size,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Open-handle cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_connections: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_connections: 16,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQLVIZ_CONFIG`
    /// 2. `./sqlviz.toml`
    /// 3. `<config dir>/sqlviz/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sqlviz.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqlviz").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let l = &self.limits;
        let positive = [
            ("limits.default_page_size", u64::from(l.default_page_size)),
            ("limits.max_page_size", u64::from(l.max_page_size)),
            ("limits.default_sample_size", u64::from(l.default_sample_size)),
            ("limits.max_sample_size", u64::from(l.max_sample_size)),
            ("limits.preview_rows", u64::from(l.preview_rows)),
            ("limits.export_rows", u64::from(l.export_rows)),
            ("limits.query_timeout_ms", l.query_timeout_ms),
            ("cache.max_connections", self.cache.max_connections as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(SettingsError::InvalidConfig(format!(
                "{} must be greater than zero",
                name
            )));
        }
        if self.storage.app_db.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "storage.app_db must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// App store path with environment variables expanded.
    pub fn app_db_path(&self) -> Result<PathBuf, SettingsError> {
        Ok(PathBuf::from(expand_env_vars(&self.storage.app_db)?))
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            let name = std::iter::from_fn(|| chars.next_if(|&ch| ch != '}')).collect();
            chars.next_if_eq(&'}');
            name
        } else {
            std::iter::from_fn(|| chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_')).collect()
        };

        if var_name.is_empty() {
            // lone '$'
            result.push('$');
            continue;
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
