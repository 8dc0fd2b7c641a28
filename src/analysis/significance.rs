//! Significance classification of the latest transformed value.
//!
//! Precedence, first match wins:
//!   1. current == series maximum  →  record high
//!   2. current == series minimum  →  record low
//!   3. current <= lower bound     →  significant low
//!   4. current >= upper bound     →  significant high
//!   5. otherwise                  →  not significant
//!
//! Record tests use exact floating point equality against extrema taken
//! from the same transformed values the current value came from. There is
//! no tolerance: a current value that differs from the maximum in the last
//! bit is not a record. Threshold comparisons are inclusive, so a value
//! sitting exactly on a bound is significant.
//!
//! A series whose defined values are all equal has no spread; nothing in
//! it is a record or an excursion and it always classifies as not
//! significant.

use crate::model::{Bounds, SignificanceLabel, SignificanceResult};

/// Classifies `current_value` against the extrema of `values` and `bounds`.
///
/// `years_span` is carried into the result for display only; it plays no
/// part in the decision. Undefined bounds never match a threshold test.
pub fn classify(
    values: &[Option<f64>],
    bounds: &Bounds,
    current_value: f64,
    years_span: i32,
) -> SignificanceResult {
    let label = label_for(values, bounds, current_value);
    SignificanceResult {
        is_significant: label != SignificanceLabel::None,
        label,
        years_span,
    }
}

fn label_for(values: &[Option<f64>], bounds: &Bounds, current: f64) -> SignificanceLabel {
    let defined = values.iter().filter_map(|v| *v);
    let (min, max) = defined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !current.is_finite() || max <= min {
        return SignificanceLabel::None;
    }

    if current == max {
        SignificanceLabel::RecordHigh
    } else if current == min {
        SignificanceLabel::RecordLow
    } else if current <= bounds.lower {
        SignificanceLabel::ThresholdLow
    } else if current >= bounds.upper {
        SignificanceLabel::ThresholdHigh
    } else {
        SignificanceLabel::None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
