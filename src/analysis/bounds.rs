//! Statistical envelope around a transformed series.

use crate::model::Bounds;

/// Default envelope width, in standard deviations.
pub const DEFAULT_SIGMA: f64 = 2.0;

/// Computes `mean ± k·σ` over the defined values.
///
/// σ is the sample standard deviation (n − 1 denominator). With fewer
/// than two values σ is undefined and [`Bounds::UNDEFINED`] is returned;
/// callers must treat that as "cannot classify", not "not significant".
pub fn compute_bounds(values: &[Option<f64>], k: f64) -> Bounds {
    let defined: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    let (Some(mean), Some(std)) = (mean(&defined), sample_std_dev(&defined)) else {
        return Bounds::UNDEFINED;
    };
    Bounds {
        lower: mean - k * std,
        upper: mean + k * std,
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, `None` with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}
