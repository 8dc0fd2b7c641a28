/// Data API Client
///
/// Retrieves data points and entity metadata (names, units, region
/// hierarchy) from the agricultural / geospatial data API. This is the
/// production implementation of the `ingest` collaborator traits; the
/// alert pipeline itself never sees HTTP.
///
/// Requests authenticate with a bearer token. Transient failures
/// (transport errors, 5xx, 429) are retried with a linear backoff.

use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::ingest::units::{convert_points, ConversionFactor};
use crate::ingest::{EntityKind, EntityLookup, RegionHierarchy, SeriesSelection, SeriesSource};
use crate::logging::{self, Stage};
use crate::model::{DataPoint, IngestError, Series};

pub const DEFAULT_API_HOST: &str = "https://api.gro-intelligence.com";
pub const DEFAULT_MAX_RETRIES: u32 = 4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const BACKOFF_STEP_MS: u64 = 500;

// ============================================================================
// API Response Structures
// ============================================================================

/// Envelope of a single-entity lookup response.
#[derive(Debug, Deserialize)]
struct EntityResponse {
    data: Entity,
}

/// Metadata of an item, metric, region, unit or frequency.
#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Region level (country = 3, province = 4, ...). Regions only.
    #[serde(default)]
    pub level: Option<u8>,
    /// Ids of regions directly contained in this one. Regions only.
    #[serde(default)]
    pub contains: Vec<u64>,
    /// Units only.
    #[serde(default, rename = "baseConvFactor")]
    pub base_conv_factor: Option<ConversionFactor>,
}

impl Entity {
    /// Units display by abbreviation when they have one.
    pub fn display_name(&self, kind: EntityKind) -> String {
        match (&self.abbreviation, kind) {
            (Some(abbr), EntityKind::Unit) if !abbr.trim().is_empty() => abbr.clone(),
            _ => self.name.clone(),
        }
    }
}

// ============================================================================
// URL construction and parsing
// ============================================================================

pub fn build_data_url(host: &str, selection: &SeriesSelection) -> String {
    format!(
        "{}/v2/data?metricId={}&itemId={}&regionId={}&frequencyId={}&sourceId={}",
        host.trim_end_matches('/'),
        selection.metric_id,
        selection.item_id,
        selection.region_id,
        selection.frequency_id,
        selection.source_id
    )
}

pub fn build_entity_url(host: &str, kind: EntityKind, id: u64) -> String {
    format!("{}/v2/{}/{}", host.trim_end_matches('/'), kind.collection(), id)
}

/// Parses a data-points response body (a JSON array of points).
pub fn parse_data_points(body: &str) -> Result<Vec<DataPoint>, IngestError> {
    serde_json::from_str(body).map_err(|e| IngestError::ParseError(e.to_string()))
}

/// Parses a single-entity lookup response body.
pub fn parse_entity(body: &str) -> Result<Entity, IngestError> {
    serde_json::from_str::<EntityResponse>(body)
        .map(|r| r.data)
        .map_err(|e| IngestError::ParseError(e.to_string()))
}

/// Breadth-first walk of the `contains` lists below `root`, collecting
/// regions at `level`. Regions already at or below `level` are not
/// descended into.
///
/// Only a failed lookup of `root` fails the walk. A child region whose
/// lookup fails is logged and left out, along with everything below it.
pub fn collect_descendants<F>(root: u64, level: u8, mut lookup: F) -> Result<Vec<u64>, IngestError>
where
    F: FnMut(u64) -> Result<Entity, IngestError>,
{
    let mut found = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(id) = queue.pop_front() {
        let region = match lookup(id) {
            Ok(region) => region,
            Err(e) if id == root => return Err(e),
            Err(e) => {
                logging::log_ingest_failure(&id.to_string(), "region lookup", &e);
                continue;
            }
        };
        if id != root && region.level == Some(level) {
            found.push(id);
            continue;
        }
        if region.level.is_none_or(|l| l < level) {
            for child in region.contains {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }
    }

    Ok(found)
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking client for the data API, constructed once and passed to the
/// batch entry points.
pub struct GroClient {
    http: reqwest::blocking::Client,
    host: String,
    token: String,
    max_retries: u32,
}

impl GroClient {
    pub fn new(
        host: &str,
        token: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, IngestError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            host: host.to_string(),
            token: token.to_string(),
            max_retries,
        })
    }

    /// Looks up the full metadata of one entity.
    pub fn lookup(&self, kind: EntityKind, id: u64) -> Result<Entity, IngestError> {
        let body = self.get_text(&build_entity_url(&self.host, kind, id))?;
        parse_entity(&body)
    }

    fn conversion_factor(&self, unit_id: u64) -> Result<ConversionFactor, IngestError> {
        self.lookup(EntityKind::Unit, unit_id)?
            .base_conv_factor
            .ok_or(IngestError::NotConvertible(unit_id))
    }

    /// GET with retries on transient failures.
    fn get_text(&self, url: &str) -> Result<String, IngestError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self
                .http
                .get(url)
                .bearer_auth(&self.token)
                .header("Accept", "application/json")
                .send()
            {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .map_err(|e| IngestError::Transport(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    let err = IngestError::HttpError(status.as_u16());
                    if !(status.is_server_error() || status.as_u16() == 429) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => IngestError::Transport(e.to_string()),
            };

            if attempt > self.max_retries {
                return Err(err);
            }
            logging::warn(
                Stage::Api,
                None,
                &format!(
                    "{} (attempt {}/{}), retrying: {}",
                    url,
                    attempt,
                    self.max_retries + 1,
                    err
                ),
            );
            std::thread::sleep(Duration::from_millis(BACKOFF_STEP_MS * u64::from(attempt)));
        }
    }
}

impl EntityLookup for GroClient {
    fn display_name(&self, kind: EntityKind, id: u64) -> Result<String, IngestError> {
        Ok(self.lookup(kind, id)?.display_name(kind))
    }
}

impl SeriesSource for GroClient {
    fn fetch_series(&self, selection: &SeriesSelection) -> Result<Series, IngestError> {
        let body = self.get_text(&build_data_url(&self.host, selection))?;
        let mut points = parse_data_points(&body)?;
        if points.is_empty() {
            return Err(IngestError::NoDataAvailable(selection.to_string()));
        }
        if let Some(target) = selection.unit_id {
            points = convert_points(points, target, |unit_id| self.conversion_factor(unit_id))?;
        }
        logging::debug(
            Stage::Api,
            Some(&selection.region_id.to_string()),
            &format!("fetched {} points", points.len()),
        );
        Series::from_unsorted(points).map_err(|e| IngestError::ParseError(e.to_string()))
    }
}

impl RegionHierarchy for GroClient {
    fn descendant_regions(&self, region_id: u64, level: u8) -> Result<Vec<u64>, IngestError> {
        collect_descendants(region_id, level, |id| self.lookup(EntityKind::Region, id))
    }
}

// ============================================================================
// Tests
// ============================================================================
