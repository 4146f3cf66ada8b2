//! # Application Configuration
//!
//! The configuration structure for `callboard-server`, loaded from a
//! `config.yml` file layered with environment variables. The YAML may refer to
//! environment variables as `${VAR}`; they are substituted before parsing.

use callboard::{appointments::DEFAULT_APPOINTMENT_MINUTES, providers::calendar::DEFAULT_CALENDAR_API_URL};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, path::Path};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An error from the underlying `config` crate.
    #[error("Configuration error: {0}")]
    General(String),
    /// An explicitly requested configuration file was not found.
    #[error("{0}")]
    NotFound(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Loaded from the `PORT` env var when set.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the local database file. Loaded from `DB_URL` when set.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// The browser origin allowed by CORS. Any origin when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
    pub auth: AuthConfig,
    /// A hosted database to use instead of the local file.
    #[serde(default)]
    pub managed_db: Option<ManagedDbConfig>,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// The HS256 secret shared with the identity provider.
    pub jwt_secret: String,
    /// Base URL of the identity provider's admin API (account creation).
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManagedDbConfig {
    pub rest_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_api_url")]
    pub api_url: String,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_url: default_calendar_api_url(),
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

fn default_port() -> u16 {
    3001
}

fn default_db_url() -> String {
    "db/callboard.db".to_string()
}

fn default_calendar_api_url() -> String {
    DEFAULT_CALENDAR_API_URL.to_string()
}

fn default_duration_minutes() -> i64 {
    DEFAULT_APPOINTMENT_MINUTES
}

// Substituted variables that are unset become empty strings, which the
// optional settings treat as absent.
fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    fn normalize(mut self) -> Self {
        self.cors_origin = blank_to_none(self.cors_origin);
        self.auth.api_url = blank_to_none(self.auth.api_url);
        self.auth.service_key = blank_to_none(self.auth.service_key);
        self.managed_db = self
            .managed_db
            .filter(|m| !m.rest_url.trim().is_empty() && !m.api_key.trim().is_empty());
        self
    }
}

// Reads a file and substitutes `${VAR}` references from the environment.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - Top-level keys like `port` and `db_url` are overridden by `PORT` and `DB_URL`.
/// - Nested keys are overridden by `CALLBOARD_...` variables (e.g. `CALLBOARD_AUTH__JWT_SECRET`).
///
/// An explicit path must exist. Without one, `config.yml` next to the manifest
/// is used when present and the environment alone otherwise.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder()
        .set_default("port", i64::from(default_port()))?
        .set_default("db_url", default_db_url())?;

    let main_content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => {
            let default_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            let content = read_and_substitute(&default_path)?;
            if content.is_some() {
                info!("Loading configuration from '{default_path}'.");
            }
            content
        }
    };
    if let Some(content) = main_content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("CALLBOARD")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config.normalize())
}
