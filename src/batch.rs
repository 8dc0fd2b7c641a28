//! Batch orchestration across many regional series.
//!
//! Every series runs through [`AlertComposer`] on its own. A failure in
//! one series (fetch error, lookup error, malformed points) is recorded
//! as that series' outcome and the batch moves on; nothing a single
//! series does can abort its siblings.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::alert::compose::AlertComposer;
use crate::alert::AlertSettings;
use crate::ingest::{EntityLookup, SeriesSelection, SeriesSource};
use crate::logging;
use crate::model::{Alert, AlertError, Series};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one series of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesOutcome {
    /// Human-readable identity of the series or selection.
    pub label: String,
    /// Region the series belongs to, used for log context.
    pub region_id: u64,
    pub result: Result<Option<Alert>, AlertError>,
}

impl SeriesOutcome {
    pub fn alert(&self) -> Option<&Alert> {
        self.result.as_ref().ok().and_then(|a| a.as_ref())
    }

    /// True when the series failed rather than being quiet or suppressed.
    pub fn is_failure(&self) -> bool {
        matches!(&self.result, Err(e) if !e.is_suppression())
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_suppression())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Alerts of one batch run under a report title.
///
/// Renders as the title followed by one alert per line, or as an empty
/// string when the batch produced no alerts.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub alerts: Vec<String>,
    pub outcomes: Vec<SeriesOutcome>,
}

impl Report {
    fn from_outcomes(title: &str, outcomes: Vec<SeriesOutcome>) -> Self {
        let alerts = outcomes
            .iter()
            .filter_map(SeriesOutcome::alert)
            .map(|a| a.to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Self {
            title: title.to_string(),
            alerts,
            outcomes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn failures(&self) -> Vec<&SeriesOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }

    pub fn suppressed(&self) -> Vec<&SeriesOutcome> {
        self.outcomes.iter().filter(|o| o.is_suppressed()).collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alerts.is_empty() {
            return Ok(());
        }
        write!(f, "{}", self.title)?;
        for line in &self.alerts {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs batches against an injected lookup collaborator.
pub struct BatchRunner<'a> {
    composer: AlertComposer<'a>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(lookup: &'a dyn EntityLookup, settings: AlertSettings) -> Self {
        Self {
            composer: AlertComposer::new(lookup, settings),
        }
    }

    /// Composes every series as of `now` and collects the alerts.
    pub fn run_batch_at(&self, series: &[Series], title: &str, now: DateTime<Utc>) -> Report {
        let outcomes = series
            .iter()
            .map(|s| SeriesOutcome {
                label: s.key().to_string(),
                region_id: s.key().region_id,
                result: self.composer.compose_at(s, now),
            })
            .collect();
        self.finish(title, outcomes)
    }

    /// Convenience wrapper that uses the real current time.
    pub fn run_batch(&self, series: &[Series], title: &str) -> Report {
        self.run_batch_at(series, title, Utc::now())
    }

    /// Fetches each selection through `source`, then composes it.
    ///
    /// A failed fetch becomes an `AlertError::Fetch` outcome for that
    /// selection only.
    pub fn fetch_and_run_at(
        &self,
        source: &dyn SeriesSource,
        selections: &[SeriesSelection],
        title: &str,
        now: DateTime<Utc>,
    ) -> Report {
        let outcomes = selections
            .iter()
            .map(|selection| {
                let result = match source.fetch_series(selection) {
                    Ok(series) => self.composer.compose_at(&series, now),
                    Err(e) => {
                        logging::log_ingest_failure(
                            &selection.region_id.to_string(),
                            "fetch",
                            &e,
                        );
                        Err(AlertError::Fetch {
                            selection: selection.to_string(),
                            source: e,
                        })
                    }
                };
                SeriesOutcome {
                    label: selection.to_string(),
                    region_id: selection.region_id,
                    result,
                }
            })
            .collect();
        self.finish(title, outcomes)
    }

    pub fn fetch_and_run(
        &self,
        source: &dyn SeriesSource,
        selections: &[SeriesSelection],
        title: &str,
    ) -> Report {
        self.fetch_and_run_at(source, selections, title, Utc::now())
    }

    fn finish(&self, title: &str, outcomes: Vec<SeriesOutcome>) -> Report {
        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                // Fetch failures were already logged with their API context.
                if !matches!(e, AlertError::Fetch { .. }) {
                    logging::log_series_failure(&outcome.region_id.to_string(), "compose", e);
                }
            }
        }

        let report = Report::from_outcomes(title, outcomes);
        logging::log_batch_summary(
            title,
            report.outcomes.len(),
            report.alerts.len(),
            report.failures().len(),
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
