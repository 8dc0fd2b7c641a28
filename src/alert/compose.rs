//! Per-series alert composition.
//!
//! Runs the full pipeline for one series:
//!
//!   staleness gate → sufficiency gate → transform → bounds → classify
//!   → deviation phrase → headline lookups
//!
//! and produces at most one alert. Gates and undefined statistics end the
//! pipeline with a suppression error (see `AlertError::is_suppression`);
//! a value inside its historical range ends it with `Ok(None)`.

use chrono::{DateTime, Utc};

use crate::alert::deviation::format_deviation;
use crate::alert::stalenesses::{age_days_at, is_stale_at};
use crate::alert::AlertSettings;
use crate::analysis::bounds::{compute_bounds, mean};
use crate::analysis::significance::classify;
use crate::analysis::transform::transform_with;
use crate::ingest::{EntityKind, EntityLookup};
use crate::logging;
use crate::metrics::{policy_for, MetricPolicy};
use crate::model::{Alert, AlertError, Series, SignificanceResult, TransformedSeries};

pub struct AlertComposer<'a> {
    lookup: &'a dyn EntityLookup,
    settings: AlertSettings,
}

impl<'a> AlertComposer<'a> {
    pub fn new(lookup: &'a dyn EntityLookup, settings: AlertSettings) -> Self {
        Self { lookup, settings }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    /// Composes the alert for `series` as of `now`.
    ///
    /// `Ok(None)` means the latest value is not significant.
    pub fn compose_at(
        &self,
        series: &Series,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, AlertError> {
        let key = series.key();
        let last = series.last();

        if is_stale_at(last, self.settings.stale_after_days, now) {
            return Err(AlertError::StaleData {
                series: key,
                age_days: age_days_at(last, now),
            });
        }
        if series.len() <= self.settings.min_points {
            return Err(AlertError::InsufficientData {
                series: key,
                points: series.len(),
                required: self.settings.min_points,
            });
        }

        let policy = policy_for(key.metric_id);
        // The original frequency name is only needed for headlines of
        // unaliased metrics; it is looked up once a series is significant.
        let transformed = transform_with(series, policy, "");
        let current = transformed
            .current_value()
            .ok_or(AlertError::NoCurrentValue(key))?;

        let bounds = compute_bounds(&transformed.values, self.settings.sigma);
        if !bounds.is_defined() {
            return Err(AlertError::UndefinedBounds(key));
        }

        let result = classify(&transformed.values, &bounds, current, series.years_span());
        if !result.is_significant {
            return Ok(None);
        }

        let historical_mean = mean(&transformed.defined_values()).unwrap_or(0.0);
        let phrase = format_deviation(current, historical_mean, policy.deviation);
        let headline = self.headline(series, policy, &transformed, current, &phrase)?;

        Ok(Some(Alert {
            headline,
            detail: detail(&result),
        }))
    }

    /// Convenience wrapper that uses the real current time.
    pub fn compose(&self, series: &Series) -> Result<Option<Alert>, AlertError> {
        self.compose_at(series, Utc::now())
    }

    /// The alert line for `series`, or an empty string when there is none.
    ///
    /// Suppressions and failures are logged, never returned.
    pub fn compose_line_at(&self, series: &Series, now: DateTime<Utc>) -> String {
        match self.compose_at(series, now) {
            Ok(Some(alert)) => alert.to_string(),
            Ok(None) => String::new(),
            Err(e) => {
                logging::log_series_failure(&series.key().region_id.to_string(), "compose", &e);
                String::new()
            }
        }
    }

    fn headline(
        &self,
        series: &Series,
        policy: &MetricPolicy,
        transformed: &TransformedSeries,
        current: f64,
        phrase: &str,
    ) -> Result<String, AlertError> {
        let key = series.key();
        let region = self.name_of(EntityKind::Region, key.region_id)?;

        let subject = match policy.alias {
            Some(alias) => alias.to_string(),
            None => {
                let last = series.last();
                let item = self.name_of(EntityKind::Item, key.item_id)?;
                let metric = self.name_of(EntityKind::Metric, key.metric_id)?;
                let frequency = if transformed.frequency_label.is_empty() {
                    let frequency_id = last.frequency_id.ok_or(AlertError::MissingField {
                        series: key,
                        field: "frequency_id",
                    })?;
                    self.name_of(EntityKind::Frequency, frequency_id)?
                } else {
                    transformed.frequency_label.clone()
                };
                let unit_id = last.unit_id.ok_or(AlertError::MissingField {
                    series: key,
                    field: "unit_id",
                })?;
                let unit = self.name_of(EntityKind::Unit, unit_id)?;
                format!(
                    "{} {} ({}) at {} {}",
                    item,
                    metric,
                    frequency,
                    format_value(current),
                    unit
                )
            }
        };

        if phrase.is_empty() {
            Ok(format!("{}: {} is a", region, subject))
        } else {
            Ok(format!("{}: {} is {}", region, subject, phrase))
        }
    }

    fn name_of(&self, kind: EntityKind, id: u64) -> Result<String, AlertError> {
        self.lookup
            .display_name(kind, id)
            .map_err(|e| AlertError::Lookup {
                kind: kind.to_string(),
                id,
                reason: e.to_string(),
            })
    }
}

/// Significance clause, e.g. `"record high in 18 years"`.
fn detail(result: &SignificanceResult) -> String {
    format!("{} in {} years", result.label.phrase(), result.years_span)
}

/// Values above 100 in magnitude get thousands separators and no
/// decimals; smaller values keep two decimals.
pub fn format_value(value: f64) -> String {
    if value.abs() <= 100.0 {
        return format!("{:.2}", value);
    }
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
