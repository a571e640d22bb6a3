//! Configuration module for sqlviz.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CacheSettings, LimitSettings, ServerSettings, Settings, SettingsError,
    StorageSettings, CONFIG_ENV_VAR,
};
