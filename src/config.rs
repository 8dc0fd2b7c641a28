//! Service configuration.
//!
//! Loaded from a TOML file (default `./alerts.toml`). Every section is
//! optional and falls back to defaults; `[[batch]]` entries describe the
//! reports to produce. The API token is never stored in the file. It is
//! read from `GROAPI_TOKEN`, which may come from a `.env` file.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::alert::stalenesses::MAX_STALE_AFTER_DAYS;
use crate::alert::AlertSettings;
use crate::ingest::gro::{DEFAULT_API_HOST, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::ingest::{SeriesSelection, REGION_LEVEL_PROVINCE};
use crate::logging::LogLevel;

pub const DEFAULT_CONFIG_PATH: &str = "./alerts.toml";
pub const TOKEN_ENV_VAR: &str = "GROAPI_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("Cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("{0} is not set")]
    MissingToken(&'static str),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.level).unwrap_or(LogLevel::Info)
    }
}

/// One report: a metric/item pair across all regions at `region_level`
/// below `parent_region_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchConfig {
    pub title: String,
    pub parent_region_id: u64,
    #[serde(default = "default_region_level")]
    pub region_level: u8,
    pub metric_id: u64,
    pub item_id: u64,
    pub frequency_id: u64,
    pub source_id: u64,
    #[serde(default)]
    pub unit_id: Option<u64>,
}

fn default_region_level() -> u8 {
    REGION_LEVEL_PROVINCE
}

impl BatchConfig {
    /// Selections for each of `region_ids`.
    pub fn selections(&self, region_ids: &[u64]) -> Vec<SeriesSelection> {
        region_ids
            .iter()
            .map(|&region_id| SeriesSelection {
                metric_id: self.metric_id,
                item_id: self.item_id,
                region_id,
                frequency_id: self.frequency_id,
                source_id: self.source_id,
                unit_id: self.unit_id,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub alerts: AlertSettings,
    pub logging: LoggingConfig,
    #[serde(rename = "batch")]
    pub batches: Vec<BatchConfig>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses and validates configuration text. `origin` names the source in
/// error messages.
pub fn parse_config(text: &str, origin: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        reason: e.to_string(),
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&text, &path.display().to_string())
}

/// Reads the API token, loading `.env` first if present.
pub fn load_token() -> Result<String, ConfigError> {
    dotenv::dotenv().ok();
    std::env::var(TOKEN_ENV_VAR)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::MissingToken(TOKEN_ENV_VAR))
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.alerts.sigma.is_nan() || config.alerts.sigma <= 0.0 {
        return Err(ConfigError::Invalid(format!(
            "alerts.sigma must be positive, got {}",
            config.alerts.sigma
        )));
    }
    if config.alerts.stale_after_days <= 0
        || config.alerts.stale_after_days > MAX_STALE_AFTER_DAYS
    {
        return Err(ConfigError::Invalid(format!(
            "alerts.stale_after_days must be between 1 and {}, got {}",
            MAX_STALE_AFTER_DAYS, config.alerts.stale_after_days
        )));
    }
    if let Some(batch) = config.batches.iter().find(|b| b.title.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "batch for metric {} has an empty title",
            batch.metric_id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
