//! Percent-deviation phrases for alert headlines.
//!
//! What "percent from normal" means depends on the metric (see
//! `metrics::DeviationKind`):
//!
//! - `RatioToNormal`: the value is already a percentage of normal where
//!   100 is normal. Deviation is `value - 100`, percent is `value / 100`.
//! - `SignedDeviation`: the value already is the fractional deviation.
//!   Percent is `|value|`, direction is the sign of the value.
//! - `Relative`: deviation is `value - mean`, percent is
//!   `|deviation| / |mean|`. A zero mean cannot be expressed as a percent
//!   and yields an empty phrase.

use crate::metrics::{policy_for, DeviationKind};

/// Phrase for `current_value` using the deviation semantics of `metric_id`.
pub fn deviation_phrase(current_value: f64, historical_mean: f64, metric_id: u64) -> String {
    format_deviation(current_value, historical_mean, policy_for(metric_id).deviation)
}

/// Renders e.g. `"45% above average which is a"`.
///
/// Returns an empty string when the deviation cannot be expressed as a
/// percentage (zero or non-finite mean for relative metrics).
pub fn format_deviation(current_value: f64, historical_mean: f64, kind: DeviationKind) -> String {
    let (deviation, fraction) = match kind {
        DeviationKind::RatioToNormal => (current_value - 100.0, current_value / 100.0),
        DeviationKind::SignedDeviation => (current_value, current_value.abs()),
        DeviationKind::Relative => {
            if historical_mean == 0.0 {
                return String::new();
            }
            let deviation = current_value - historical_mean;
            (deviation, deviation.abs() / historical_mean.abs())
        }
    };

    let Some(percent) = format_percent(fraction) else {
        return String::new();
    };
    let direction = if deviation >= 0.0 { "above" } else { "below" };
    format!("{percent} {direction} average which is a")
}

/// `0.453` → `"45%"`, rounding half away from zero.
pub fn format_percent(fraction: f64) -> Option<String> {
    let scaled = fraction * 100.0;
    if !scaled.is_finite() {
        return None;
    }
    Some(format!("{}%", scaled.round() as i64))
}
