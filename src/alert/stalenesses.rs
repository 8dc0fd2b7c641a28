/// Series staleness detection.
///
/// Alerts describe "what is happening now"; a series whose newest point
/// is weeks old would produce an alert about a situation that may have
/// long passed. The composer uses this module to suppress such series.
///
/// The reference timestamp of a point is its `reporting_date` when the
/// source publishes one, otherwise its `end_date`.
///
/// The `*_at` functions take the current time as `now`; only `is_stale`
/// reads the system clock.

use chrono::{DateTime, Duration, Utc};

use crate::model::DataPoint;

/// Default maximum age, in days, before a series is considered stale.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 30;

/// Largest threshold a `Duration` can hold (`i64::MAX` milliseconds).
pub const MAX_STALE_AFTER_DAYS: i64 = i64::MAX / 86_400_000;

/// The most recent timestamp known for `point`.
pub fn reference_timestamp(point: &DataPoint) -> DateTime<Utc> {
    point.reporting_date.unwrap_or(point.end_date)
}

/// Whole days between the point's reference timestamp and `now`.
pub fn age_days_at(point: &DataPoint, now: DateTime<Utc>) -> i64 {
    (now - reference_timestamp(point)).num_days()
}

/// Returns `true` if the point is at least `max_age_days` old at `now`.
///
/// Staleness is inclusive of the threshold:
///   age >= max_age_days  →  stale
///   age <  max_age_days  →  not stale
///
/// A threshold beyond `MAX_STALE_AFTER_DAYS` is never reached.
pub fn is_stale_at(point: &DataPoint, max_age_days: i64, now: DateTime<Utc>) -> bool {
    match Duration::try_days(max_age_days) {
        Some(threshold) => now - reference_timestamp(point) >= threshold,
        None => false,
    }
}

/// Convenience wrapper that uses the real current time.
/// Use `is_stale_at` in tests to keep them deterministic.
pub fn is_stale(point: &DataPoint, max_age_days: i64) -> bool {
    is_stale_at(point, max_age_days, Utc::now())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
