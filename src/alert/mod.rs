//! Alert text generation.
//!
//! Submodules:
//! - `stalenesses` — suppresses series whose newest point is too old.
//! - `deviation` — percent-from-normal phrases.
//! - `compose` — runs the pipeline for one series and builds the alert line.

use serde::Deserialize;

use crate::analysis::bounds::DEFAULT_SIGMA;
use stalenesses::DEFAULT_STALE_AFTER_DAYS;

pub mod compose;
pub mod deviation;
pub mod stalenesses;

/// Default number of points a series must exceed to be classified.
pub const DEFAULT_MIN_POINTS: usize = 3;

/// Tunables of the per-series pipeline. Loaded from the `[alerts]`
/// section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Envelope width in standard deviations.
    pub sigma: f64,
    /// Series whose newest point is at least this old are suppressed.
    pub stale_after_days: i64,
    /// Series need strictly more points than this.
    pub min_points: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_SIGMA,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}
