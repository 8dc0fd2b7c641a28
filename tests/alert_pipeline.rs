//! Alert pipeline integration tests
//!
//! Drive the public batch API end to end with in-memory collaborators in
//! place of the data API. No network access is needed.
//!
//! Run with: cargo test --test alert_pipeline

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;

use geoalert_service::alert::AlertSettings;
use geoalert_service::analysis::groupings::group_into_series;
use geoalert_service::batch::BatchRunner;
use geoalert_service::ingest::{EntityKind, EntityLookup, SeriesSelection, SeriesSource};
use geoalert_service::metrics::{METRIC_EVAPOTRANSPIRATION, METRIC_RAINFALL};
use geoalert_service::model::{AlertError, DataPoint, IngestError, Series};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ITEM_RAIN: u64 = 2039;

struct MemoryNames(HashMap<(EntityKind, u64), &'static str>);

impl EntityLookup for MemoryNames {
    fn display_name(&self, kind: EntityKind, id: u64) -> Result<String, IngestError> {
        self.0
            .get(&(kind, id))
            .map(|name| name.to_string())
            .ok_or(IngestError::EntityNotFound { kind: kind.to_string(), id })
    }
}

/// Serves pre-built points per region; regions without points have no data.
struct MemorySource(HashMap<u64, Vec<DataPoint>>);

impl SeriesSource for MemorySource {
    fn fetch_series(&self, selection: &SeriesSelection) -> Result<Series, IngestError> {
        let points = self
            .0
            .get(&selection.region_id)
            .cloned()
            .ok_or_else(|| IngestError::NoDataAvailable(selection.to_string()))?;
        Series::from_unsorted(points).map_err(|e| IngestError::ParseError(e.to_string()))
    }
}

fn names() -> MemoryNames {
    MemoryNames(HashMap::from([
        ((EntityKind::Region, 1), "Nakuru"),
        ((EntityKind::Region, 2), "Kisumu"),
        ((EntityKind::Region, 3), "Mombasa"),
    ]))
}

/// 2024-05-01 00:00:00 UTC
fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// Daily points for one region, the newest `age_days` before `fixed_now()`.
fn daily_points(metric_id: u64, region_id: u64, values: &[f64], age_days: i64) -> Vec<DataPoint> {
    let last = fixed_now() - Duration::days(age_days);
    let n = values.len() as i64;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let end = last - Duration::days(n - 1 - i as i64);
            DataPoint {
                start_date: end,
                end_date: end,
                value: Some(*v),
                unit_id: Some(2),
                metric_id,
                item_id: ITEM_RAIN,
                region_id,
                frequency_id: Some(1),
                reporting_date: None,
            }
        })
        .collect()
}

/// Three quiet weeks then a wet one: weekly totals 7, 7, 7, 35.
fn wet_week() -> Vec<f64> {
    let mut values = vec![1.0; 21];
    values.extend([5.0; 7]);
    values
}

fn rainfall_selection(region_id: u64) -> SeriesSelection {
    SeriesSelection {
        metric_id: METRIC_RAINFALL,
        item_id: ITEM_RAIN,
        region_id,
        frequency_id: 1,
        source_id: 35,
        unit_id: None,
    }
}

// ---------------------------------------------------------------------------
// Batch runs
// ---------------------------------------------------------------------------

#[test]
fn test_batch_isolates_fetch_failures_and_suppressions() {
    let lookup = names();
    let source = MemorySource(HashMap::from([
        (1, daily_points(METRIC_RAINFALL, 1, &wet_week(), 1)),
        // Region 2 has no data at all.
        (3, daily_points(METRIC_RAINFALL, 3, &wet_week(), 45)),
    ]));
    let runner = BatchRunner::new(&lookup, AlertSettings::default());
    let selections: Vec<SeriesSelection> = [1, 2, 3].into_iter().map(rainfall_selection).collect();

    let report = runner.fetch_and_run_at(&source, &selections, "Kenya rainfall", fixed_now());

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.alerts.len(), 1);

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].region_id, 2);
    assert!(matches!(
        failures[0].result,
        Err(AlertError::Fetch { source: IngestError::NoDataAvailable(_), .. })
    ));

    let suppressed = report.suppressed();
    assert_eq!(suppressed.len(), 1);
    assert_eq!(suppressed[0].region_id, 3);
    assert!(matches!(
        suppressed[0].result,
        Err(AlertError::StaleData { age_days: 45, .. })
    ));

    assert_eq!(
        report.to_string(),
        "Kenya rainfall\n\
         Nakuru: 7 day cumulative rainfall is 150% above average which is a record high in 0 years"
    );
}

#[test]
fn test_batch_without_alerts_renders_nothing() {
    let lookup = names();
    let source = MemorySource(HashMap::from([(
        1,
        daily_points(METRIC_RAINFALL, 1, &[1.0; 28], 1),
    )]));
    let runner = BatchRunner::new(&lookup, AlertSettings::default());

    let report = runner.fetch_and_run_at(&source, &[rainfall_selection(1)], "Quiet", fixed_now());

    assert!(report.is_empty());
    assert_eq!(report.to_string(), "");
    assert!(report.failures().is_empty());
}

#[test]
fn test_lookup_failure_skips_only_that_series() {
    // Region 3 has no name on record.
    let lookup = MemoryNames(HashMap::from([((EntityKind::Region, 1), "Nakuru")]));
    let series = group_into_series(
        [
            daily_points(METRIC_RAINFALL, 1, &wet_week(), 1),
            daily_points(METRIC_RAINFALL, 3, &wet_week(), 1),
        ]
        .concat(),
    );
    let runner = BatchRunner::new(&lookup, AlertSettings::default());

    let report = runner.run_batch_at(&series, "Kenya rainfall", fixed_now());

    assert_eq!(report.alerts.len(), 1);
    assert!(report.alerts[0].starts_with("Nakuru: "));
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].result, Err(AlertError::Lookup { id: 3, .. })));
}

// ---------------------------------------------------------------------------
// Grouping and metric policies
// ---------------------------------------------------------------------------

#[test]
fn test_grouping_restores_order_of_shuffled_points() {
    let mut points = daily_points(METRIC_RAINFALL, 1, &wet_week(), 1);
    points.reverse();
    points.extend(daily_points(METRIC_RAINFALL, 2, &[1.0; 10], 1));

    let series = group_into_series(points);

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].key().region_id, 1);
    assert_eq!(series[0].len(), 28);
    assert!(series[0]
        .points()
        .windows(2)
        .all(|pair| pair[0].end_date <= pair[1].end_date));
    assert_eq!(series[1].key().region_id, 2);
}

#[test]
fn test_evapotranspiration_reads_as_percent_of_normal() {
    let lookup = names();
    let points = daily_points(METRIC_EVAPOTRANSPIRATION, 1, &[100.0, 98.0, 102.0, 101.0, 120.0], 1);
    let series = Series::new(points).expect("fixture series should be valid");
    let runner = BatchRunner::new(&lookup, AlertSettings::default());

    let report = runner.run_batch_at(&[series], "Kenya ET", fixed_now());

    assert_eq!(
        report.alerts,
        vec!["Nakuru: evapotranspiration is 120% above average which is a record high in 0 years"]
    );
}

#[test]
fn test_stricter_settings_need_more_history() {
    let lookup = names();
    let settings = AlertSettings { min_points: 30, ..AlertSettings::default() };
    let series = group_into_series(daily_points(METRIC_RAINFALL, 1, &wet_week(), 1));
    let runner = BatchRunner::new(&lookup, settings);

    let report = runner.run_batch_at(&series, "Kenya rainfall", fixed_now());

    assert!(report.is_empty());
    assert!(matches!(
        report.suppressed()[0].result,
        Err(AlertError::InsufficientData { points: 28, required: 30, .. })
    ));
}
