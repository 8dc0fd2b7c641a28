/// Structured logging for the alerting service
///
/// Provides context-rich logging with pipeline stage and region
/// identifiers on top of `tracing`. Supports both console output and
/// file-based logging for scheduled runs.

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::model::{AlertError, IngestError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses a config value such as `"info"` or `"WARN"`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Api,
    Pipeline,
    Batch,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Api => write!(f, "API"),
            Stage::Pipeline => write!(f, "PIPE"),
            Stage::Batch => write!(f, "BATCH"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected outcome - stale, short or flat series are routine
    Expected,
    /// Unexpected failure - indicates API degradation or bad input
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are ignored. When `log_file`
/// cannot be opened, logging falls back to the console.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {}", path, e))
            .ok()
    });

    // try_init only fails when a subscriber is already installed.
    let _ = match (file, console_timestamps) {
        (Some(file), _) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
        (None, true) => builder.try_init(),
        (None, false) => builder.without_time().try_init(),
    };
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(stage: Stage, region: Option<&str>, message: &str) {
    tracing::info!(stage = %stage, region = region.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(stage: Stage, region: Option<&str>, message: &str) {
    tracing::warn!(stage = %stage, region = region.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(stage: Stage, region: Option<&str>, message: &str) {
    tracing::error!(stage = %stage, region = region.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(stage: Stage, region: Option<&str>, message: &str) {
    tracing::debug!(stage = %stage, region = region.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a per-series pipeline outcome
pub fn classify_series_failure(err: &AlertError) -> FailureType {
    if err.is_suppression() {
        return FailureType::Expected;
    }
    match err {
        AlertError::Lookup { .. }
        | AlertError::MissingField { .. }
        | AlertError::MixedSeries { .. }
        | AlertError::UnorderedSeries(_) => FailureType::Unexpected,
        AlertError::Fetch { source, .. } => classify_ingest_failure(source),
        _ => FailureType::Unknown,
    }
}

/// Classify a data API failure
pub fn classify_ingest_failure(err: &IngestError) -> FailureType {
    match err {
        // Sparse regions routinely have no data for a metric
        IngestError::NoDataAvailable(_) => FailureType::Expected,
        IngestError::HttpError(code) if *code >= 500 => FailureType::Unexpected,
        IngestError::Transport(_) | IngestError::ParseError(_) => FailureType::Unexpected,
        _ => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a per-series failure with automatic classification
pub fn log_series_failure(region: &str, operation: &str, err: &AlertError) {
    let failure_type = classify_series_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(Stage::Pipeline, Some(region), &message),
        FailureType::Unexpected => error(Stage::Pipeline, Some(region), &message),
        FailureType::Unknown => warn(Stage::Pipeline, Some(region), &message),
    }
}

/// Log a data API failure with classification
pub fn log_ingest_failure(region: &str, operation: &str, err: &IngestError) {
    let failure_type = classify_ingest_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(Stage::Api, Some(region), &message),
        FailureType::Unexpected => error(Stage::Api, Some(region), &message),
        FailureType::Unknown => warn(Stage::Api, Some(region), &message),
    }
}

// ---------------------------------------------------------------------------
// Batch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one batch run
pub fn log_batch_summary(title: &str, total: usize, alerts: usize, failed: usize) {
    let message = format!(
        "{}: {} series, {} alerts, {} failed",
        title, total, alerts, failed
    );

    if failed == 0 {
        info(Stage::Batch, None, &message);
    } else if failed == total {
        error(Stage::Batch, None, &message);
    } else {
        warn(Stage::Batch, None, &message);
    }
}
