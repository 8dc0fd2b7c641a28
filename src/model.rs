/// Core data types for the regional anomaly alerting service.
///
/// This module defines the shared domain model imported by all other modules:
/// fetched data points, per-region series, the intermediate results of the
/// detection pipeline, and the error types shared across stages.
/// It contains no I/O.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Point and series types
// ---------------------------------------------------------------------------

/// A single measurement returned by the data API.
///
/// Corresponds to one entry of a data-points response. `value` is `None`
/// when the API reports a period without data. `reporting_date` is only
/// present for sources that publish with a delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_id: Option<u64>,
    pub metric_id: u64,
    pub item_id: u64,
    pub region_id: u64,
    #[serde(default)]
    pub frequency_id: Option<u64>,
    #[serde(default)]
    pub reporting_date: Option<DateTime<Utc>>,
}

impl DataPoint {
    pub fn key(&self) -> SeriesKey {
        SeriesKey {
            metric_id: self.metric_id,
            item_id: self.item_id,
            region_id: self.region_id,
        }
    }
}

/// Identity shared by every point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub metric_id: u64,
    pub item_id: u64,
    pub region_id: u64,
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metric {} / item {} / region {}",
            self.metric_id, self.item_id, self.region_id
        )
    }
}

/// Chronologically ordered points for one (metric, item, region) triple.
///
/// Always non-empty, single-identity and ordered by `end_date` ascending;
/// the constructors enforce all three.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    key: SeriesKey,
    points: Vec<DataPoint>,
}

impl Series {
    /// Builds a series from points already ordered by `end_date`.
    pub fn new(points: Vec<DataPoint>) -> Result<Self, AlertError> {
        let first = points.first().ok_or(AlertError::EmptySeries)?;
        let key = first.key();

        if let Some(stray) = points.iter().find(|p| p.key() != key) {
            return Err(AlertError::MixedSeries {
                expected: key,
                found: stray.key(),
            });
        }
        if points.windows(2).any(|w| w[1].end_date < w[0].end_date) {
            return Err(AlertError::UnorderedSeries(key));
        }

        Ok(Self { key, points })
    }

    /// Sorts by `end_date` before validating.
    pub fn from_unsorted(mut points: Vec<DataPoint>) -> Result<Self, AlertError> {
        points.sort_by_key(|p| p.end_date);
        Self::new(points)
    }

    pub fn key(&self) -> SeriesKey {
        self.key
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> &DataPoint {
        // Non-empty by construction.
        &self.points[self.points.len() - 1]
    }

    /// Calendar years between the first and last point.
    pub fn years_span(&self) -> i32 {
        self.last().end_date.year() - self.points[0].end_date.year()
    }
}

/// A series after frequency normalization.
///
/// `values[i]` is `None` when the rolling window at that row was not yet
/// full, or when the raw value was missing and the policy passes values
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedSeries {
    pub key: SeriesKey,
    pub values: Vec<Option<f64>>,
    pub end_dates: Vec<DateTime<Utc>>,
    pub frequency_label: String,
}

impl TransformedSeries {
    /// The latest value, which is the one tested for significance.
    pub fn current_value(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// All defined values, in order.
    pub fn defined_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(|v| *v).collect()
    }
}

// ---------------------------------------------------------------------------
// Statistics and classification results
// ---------------------------------------------------------------------------

/// Two-sided `mean ± k·σ` envelope. Both edges are NaN when undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub const UNDEFINED: Bounds = Bounds {
        lower: f64::NAN,
        upper: f64::NAN,
    };

    pub fn is_defined(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignificanceLabel {
    RecordHigh,
    RecordLow,
    ThresholdHigh,
    ThresholdLow,
    None,
}

impl SignificanceLabel {
    /// Phrase used in the alert detail, e.g. "record high".
    pub fn phrase(&self) -> &'static str {
        match self {
            SignificanceLabel::RecordHigh => "record high",
            SignificanceLabel::RecordLow => "record low",
            SignificanceLabel::ThresholdHigh => "significant high",
            SignificanceLabel::ThresholdLow => "significant low",
            SignificanceLabel::None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignificanceResult {
    pub is_significant: bool,
    pub label: SignificanceLabel,
    pub years_span: i32,
}

// ---------------------------------------------------------------------------
// Alert output
// ---------------------------------------------------------------------------

/// One alert line, split into the descriptive headline and the
/// significance clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub headline: String,
    pub detail: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.headline, self.detail)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while turning one series into an alert.
///
/// Suppressions (see [`AlertError::is_suppression`]) are expected outcomes
/// of normal operation and never indicate a fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("Series has no points")]
    EmptySeries,
    #[error("Point for {found} found in series {expected}")]
    MixedSeries { expected: SeriesKey, found: SeriesKey },
    #[error("Points out of order in series {0}")]
    UnorderedSeries(SeriesKey),
    #[error("Insufficient data for {series}: {points} points, need more than {required}")]
    InsufficientData {
        series: SeriesKey,
        points: usize,
        required: usize,
    },
    #[error("Stale data for {series}: {age_days} days old")]
    StaleData { series: SeriesKey, age_days: i64 },
    #[error("Undefined bounds for {0}: fewer than 2 values")]
    UndefinedBounds(SeriesKey),
    #[error("No current value for {0}")]
    NoCurrentValue(SeriesKey),
    #[error("Missing field {field} for {series}")]
    MissingField {
        series: SeriesKey,
        field: &'static str,
    },
    #[error("Lookup failed for {kind} {id}: {reason}")]
    Lookup {
        kind: String,
        id: u64,
        reason: String,
    },
    #[error("Fetch failed for {selection}: {source}")]
    Fetch {
        selection: String,
        #[source]
        source: IngestError,
    },
}

impl AlertError {
    /// True for outcomes that silence a series without being a failure.
    pub fn is_suppression(&self) -> bool {
        matches!(
            self,
            AlertError::InsufficientData { .. }
                | AlertError::StaleData { .. }
                | AlertError::UndefinedBounds(_)
                | AlertError::NoCurrentValue(_)
        )
    }
}

/// Errors that can arise when fetching or looking up data through the
/// external data API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// Non-2xx HTTP response from the API.
    #[error("HTTP error: {0}")]
    HttpError(u16),
    /// The request never produced a response (connect failure, timeout).
    #[error("Transport error: {0}")]
    Transport(String),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The request succeeded but returned no usable points.
    #[error("No data available for {0}")]
    NoDataAvailable(String),
    /// An entity lookup returned nothing for the id.
    #[error("Entity not found: {kind} {id}")]
    EntityNotFound { kind: String, id: u64 },
    /// A unit has no base conversion factor.
    #[error("unit_id {0} is not convertible")]
    NotConvertible(u64),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
