//! Collaborators that supply data to the alert pipeline.
//!
//! The pipeline never talks to the network itself. It is handed a
//! collaborator implementing these traits, constructed once by the caller
//! (see `gro::GroClient`) or replaced by an in-memory fixture in tests.
//!
//! Submodules:
//! - `gro` — blocking HTTP client for the data API.
//! - `units` — unit conversion of fetched points.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{IngestError, Series};

pub mod gro;
pub mod units;

/// Region hierarchy levels used by the data API.
pub const REGION_LEVEL_COUNTRY: u8 = 3;
pub const REGION_LEVEL_PROVINCE: u8 = 4;
pub const REGION_LEVEL_DISTRICT: u8 = 5;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// Kinds of entity whose display names can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item,
    Unit,
    Region,
    Metric,
    Frequency,
}

impl EntityKind {
    /// Collection name used in lookup URLs.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Item => "items",
            EntityKind::Unit => "units",
            EntityKind::Region => "regions",
            EntityKind::Metric => "metrics",
            EntityKind::Frequency => "frequencies",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Item => write!(f, "item"),
            EntityKind::Unit => write!(f, "unit"),
            EntityKind::Region => write!(f, "region"),
            EntityKind::Metric => write!(f, "metric"),
            EntityKind::Frequency => write!(f, "frequency"),
        }
    }
}

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// Everything needed to request one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSelection {
    pub metric_id: u64,
    pub item_id: u64,
    pub region_id: u64,
    pub frequency_id: u64,
    pub source_id: u64,
    /// Convert fetched points to this unit when set.
    #[serde(default)]
    pub unit_id: Option<u64>,
}

impl fmt::Display for SeriesSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metric {} / item {} / region {} (frequency {}, source {})",
            self.metric_id, self.item_id, self.region_id, self.frequency_id, self.source_id
        )
    }
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Resolves entity ids to human-readable names.
pub trait EntityLookup {
    fn display_name(&self, kind: EntityKind, id: u64) -> Result<String, IngestError>;
}

/// Fetches the points of one series.
pub trait SeriesSource {
    /// Returns `IngestError::NoDataAvailable` when the selection has no points.
    fn fetch_series(&self, selection: &SeriesSelection) -> Result<Series, IngestError>;
}

/// Walks the administrative region hierarchy.
pub trait RegionHierarchy {
    /// All regions at `level` contained (directly or transitively) in `region_id`.
    fn descendant_regions(&self, region_id: u64, level: u8) -> Result<Vec<u64>, IngestError>;
}
