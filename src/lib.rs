//! Regional anomaly alerting service.
//!
//! Detects statistically unusual recent values in per-region measurement
//! series (rainfall, temperature, vegetation health, ...) and renders them
//! as one-line alerts grouped into titled reports.
//!
//! Pipeline per series:
//!   `analysis::transform` → `analysis::bounds` / `analysis::significance`
//!   → `alert::deviation` → `alert::compose`
//! and `batch` runs it over many series, isolating failures.

pub mod alert;
pub mod analysis;
pub mod batch;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod model;
