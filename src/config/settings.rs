//! Application configuration loading from config.toml
//!
//! Every field has a default, so a missing config file is not an error. Values
//! from the environment (usually populated from `.env` by `dotenvy`) take
//! precedence over the file.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/finance.sqlite?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
const DEFAULT_SESSION_HEADER: &str = "x-user-id";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `SeaORM` connection string
    pub database_url: String,
    /// Address the HTTP server listens on
    pub bind_address: String,
    /// Request header carrying the caller identity resolved by the session provider
    pub session_header: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            session_header: DEFAULT_SESSION_HEADER.to_string(),
        }
    }
}

impl AppConfig {
    /// Replaces fields with `DATABASE_URL`, `BIND_ADDRESS` and `SESSION_HEADER`
    /// when those variables are set.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(address) = std::env::var("BIND_ADDRESS") {
            self.bind_address = address;
        }
        if let Ok(header) = std::env::var("SESSION_HEADER") {
            self.session_header = header.to_ascii_lowercase();
        }
        self
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        tracing::debug!("No config file at {:?}, using defaults", path_ref);
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml) and applies
/// environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    Ok(load_config("config.toml")?.with_env_overrides())
}
