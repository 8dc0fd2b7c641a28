//! Frequency normalization of raw series.
//!
//! Daily measurements are noisy and irregular; before statistics are taken
//! the series is rolled up according to its metric policy (see
//! `metrics::METRIC_REGISTRY`) and then downsampled so consecutive rows do
//! not share window members.
//!
//! Downsampling keeps every 7th row counting back from the most recent row,
//! so the latest complete window is always the current value. Rows whose
//! window never filled stay `None` and are excluded from every statistic.

use crate::metrics::{policy_for, Aggregation, MetricPolicy};
use crate::model::{Series, TransformedSeries};

/// Transforms `series` with the policy registered for its metric.
///
/// `original_label` is the display name of the series' own frequency; it
/// is carried through unchanged for metrics whose values pass through.
pub fn transform(series: &Series, original_label: &str) -> TransformedSeries {
    transform_with(series, policy_for(series.key().metric_id), original_label)
}

pub fn transform_with(
    series: &Series,
    policy: &MetricPolicy,
    original_label: &str,
) -> TransformedSeries {
    let raw: Vec<Option<f64>> = series.points().iter().map(|p| p.value).collect();
    let end_dates: Vec<_> = series.points().iter().map(|p| p.end_date).collect();

    let filled = match policy.aggregation {
        Aggregation::Identity => {
            return TransformedSeries {
                key: series.key(),
                values: raw,
                end_dates,
                frequency_label: original_label.to_string(),
            };
        }
        Aggregation::Mean => {
            let fill = mean_of_defined(&raw);
            raw.iter().map(|v| v.or(fill)).collect::<Vec<_>>()
        }
        Aggregation::Sum => raw.iter().map(|v| Some(v.unwrap_or(0.0))).collect(),
    };

    let window = policy.aggregation.window();
    let rolled = rolling(&filled, window, policy.aggregation);
    let keep = downsample_indices(rolled.len(), window);

    TransformedSeries {
        key: series.key(),
        values: keep.iter().map(|&i| rolled[i]).collect(),
        end_dates: keep.iter().map(|&i| end_dates[i]).collect(),
        frequency_label: policy
            .aggregation
            .label()
            .unwrap_or(original_label)
            .to_string(),
    }
}

fn mean_of_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Trailing window aggregate. A row is `None` until the window is full or
/// when any member of its window is missing.
fn rolling(values: &[Option<f64>], window: usize, aggregation: Aggregation) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let members: Option<Vec<f64>> = values[i + 1 - window..=i].iter().copied().collect();
            let sum: f64 = members?.iter().sum();
            match aggregation {
                Aggregation::Mean => Some(sum / window as f64),
                _ => Some(sum),
            }
        })
        .collect()
}

/// Row indices kept after downsampling, ascending, always ending at `len - 1`.
fn downsample_indices(len: usize, step: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let mut keep: Vec<usize> = (0..len).rev().step_by(step.max(1)).collect();
    keep.reverse();
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
