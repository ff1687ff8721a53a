//! # Application Configuration
//!
//! This module defines the configuration structure for the `onboard-server`
//! and provides the logic for loading it from an optional `config.yml` file
//! and environment variables. Every key has a sensible default, so a bare
//! environment still boots a working server.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Root directory for uploaded documents. Loaded from `UPLOAD_ROOT`.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// The address the notification worker delivers new-submission notices
    /// to. Loaded from `ADMIN_CONTACT`.
    #[serde(default = "default_admin_contact")]
    pub admin_contact: String,
    /// Lifetime of issued login tokens, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_port() -> u16 {
    9090
}
fn default_db_url() -> String {
    "db/onboard.db".to_string()
}
fn default_upload_root() -> String {
    "data".to_string()
}
fn default_admin_contact() -> String {
    "admins@example.com".to_string()
}
fn default_token_ttl_secs() -> u64 {
    86_400
}

/// Loads the application configuration.
///
/// The optional `config.yml` next to the crate manifest forms the base
/// layer; plain environment variables (`PORT`, `DB_URL`, ...) override it.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let config_path = config_path_override
        .map(str::to_string)
        .unwrap_or_else(|| format!("{base_path}/config.yml"));

    let mut builder = ConfigBuilder::builder();
    if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from '{config_path}'.");
        let content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::General(format!("Failed to read config file '{config_path}': {e}"))
        })?;
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder.add_source(Environment::default()).build()?;
    Ok(settings.try_deserialize()?)
}
