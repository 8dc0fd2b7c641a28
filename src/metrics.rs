//! Metric policy registry.
//!
//! Maps a metric id to everything the pipeline needs to know about it:
//! how its raw series is aggregated, how a deviation from normal is
//! expressed, and the short display alias used in alert headlines.
//! The transformer, the deviation formatter and the composer all read
//! their metric-specific behavior from here.

// ---------------------------------------------------------------------------
// Metric ids
// ---------------------------------------------------------------------------

/// Land surface temperature, daily.
pub const METRIC_LAND_TEMPERATURE: u64 = 2540047;

/// Soil moisture, daily.
pub const METRIC_SOIL_MOISTURE: u64 = 15531082;

/// Precipitation quantity, daily.
pub const METRIC_RAINFALL: u64 = 2100031;

/// Vegetation index difference from the long-term mean.
pub const METRIC_NDVI_ANOMALY: u64 = 431132;

/// Evapotranspiration expressed as percent of normal.
pub const METRIC_EVAPOTRANSPIRATION: u64 = 15852252;

// ---------------------------------------------------------------------------
// Policy types
// ---------------------------------------------------------------------------

/// How a raw series is regularized before statistics are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Rolling 7-row mean; missing values are filled with the series mean.
    Mean,
    /// Rolling 7-row sum; missing values count as zero.
    Sum,
    /// Values pass through unchanged.
    Identity,
}

impl Aggregation {
    pub fn window(&self) -> usize {
        match self {
            Aggregation::Mean | Aggregation::Sum => 7,
            Aggregation::Identity => 1,
        }
    }

    /// Frequency label after aggregation, or `None` if unchanged.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Aggregation::Mean => Some("7-day average"),
            Aggregation::Sum => Some("7-day cumulative"),
            Aggregation::Identity => None,
        }
    }
}

/// What a metric's value means relative to "normal".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviationKind {
    /// Value is already a ratio to normal where 100 means normal.
    RatioToNormal,
    /// Value is already a signed fractional deviation.
    SignedDeviation,
    /// Deviation is measured against the historical mean.
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPolicy {
    pub metric_id: u64,
    pub name: &'static str,
    pub aggregation: Aggregation,
    pub deviation: DeviationKind,
    /// Short headline phrase; metrics without one are named from lookups.
    pub alias: Option<&'static str>,
}

/// Policy applied to metrics that are not registered.
pub static DEFAULT_POLICY: MetricPolicy = MetricPolicy {
    metric_id: 0,
    name: "unregistered metric",
    aggregation: Aggregation::Identity,
    deviation: DeviationKind::Relative,
    alias: None,
};

pub static METRIC_REGISTRY: &[MetricPolicy] = &[
    MetricPolicy {
        metric_id: METRIC_LAND_TEMPERATURE,
        name: "land temperature",
        aggregation: Aggregation::Mean,
        deviation: DeviationKind::Relative,
        alias: Some("7 day average land temperature"),
    },
    MetricPolicy {
        metric_id: METRIC_SOIL_MOISTURE,
        name: "soil moisture",
        aggregation: Aggregation::Mean,
        deviation: DeviationKind::Relative,
        alias: Some("7 day average soil moisture"),
    },
    MetricPolicy {
        metric_id: METRIC_RAINFALL,
        name: "rainfall",
        aggregation: Aggregation::Sum,
        deviation: DeviationKind::Relative,
        alias: Some("7 day cumulative rainfall"),
    },
    MetricPolicy {
        metric_id: METRIC_NDVI_ANOMALY,
        name: "vegetation index anomaly",
        aggregation: Aggregation::Identity,
        deviation: DeviationKind::SignedDeviation,
        alias: Some("vegetation health (NDVI)"),
    },
    MetricPolicy {
        metric_id: METRIC_EVAPOTRANSPIRATION,
        name: "evapotranspiration",
        aggregation: Aggregation::Identity,
        deviation: DeviationKind::RatioToNormal,
        alias: Some("evapotranspiration"),
    },
];

/// Looks up a registered policy. Returns `None` if the metric is unknown.
pub fn find_policy(metric_id: u64) -> Option<&'static MetricPolicy> {
    METRIC_REGISTRY.iter().find(|p| p.metric_id == metric_id)
}

/// Registered policy for `metric_id`, or [`DEFAULT_POLICY`].
pub fn policy_for(metric_id: u64) -> &'static MetricPolicy {
    find_policy(metric_id).unwrap_or(&DEFAULT_POLICY)
}

/// Metric ids that have a headline alias.
pub fn aliased_metric_ids() -> Vec<u64> {
    METRIC_REGISTRY
        .iter()
        .filter(|p| p.alias.is_some())
        .map(|p| p.metric_id)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_metric_ids() {
        let mut seen = std::collections::HashSet::new();
        for policy in METRIC_REGISTRY {
            assert!(
                seen.insert(policy.metric_id),
                "duplicate metric id {} in METRIC_REGISTRY",
                policy.metric_id
            );
        }
    }

    #[test]
    fn test_rolling_aggregations_have_window_and_label() {
        for policy in METRIC_REGISTRY {
            match policy.aggregation {
                Aggregation::Identity => {
                    assert_eq!(policy.aggregation.window(), 1);
                    assert!(policy.aggregation.label().is_none());
                }
                _ => {
                    assert_eq!(policy.aggregation.window(), 7, "{}", policy.name);
                    assert!(policy.aggregation.label().is_some(), "{}", policy.name);
                }
            }
        }
    }

    #[test]
    fn test_rainfall_is_cumulative() {
        let policy = find_policy(METRIC_RAINFALL).expect("rainfall should be registered");
        assert_eq!(policy.aggregation, Aggregation::Sum);
        assert_eq!(policy.alias, Some("7 day cumulative rainfall"));
    }

    #[test]
    fn test_unknown_metric_falls_back_to_identity() {
        assert!(find_policy(1).is_none());
        let policy = policy_for(1);
        assert_eq!(policy.aggregation, Aggregation::Identity);
        assert_eq!(policy.deviation, DeviationKind::Relative);
        assert!(policy.alias.is_none());
    }

    #[test]
    fn test_aliased_ids_include_ndvi() {
        let ids = aliased_metric_ids();
        assert!(ids.contains(&METRIC_NDVI_ANOMALY));
        assert_eq!(ids.len(), METRIC_REGISTRY.len());
    }
}
