/// Live checks against the data API.
///
/// Prerequisites:
/// - GROAPI_TOKEN set in the environment or .env
/// - Internet access to api.gro-intelligence.com
///
/// Run with: cargo test --test gro_api -- --ignored --test-threads=1

use std::time::Duration;

use geoalert_service::config;
use geoalert_service::ingest::gro::{GroClient, DEFAULT_API_HOST, DEFAULT_MAX_RETRIES};
use geoalert_service::ingest::{
    EntityKind, EntityLookup, RegionHierarchy, SeriesSelection, SeriesSource, REGION_LEVEL_PROVINCE,
};
use geoalert_service::metrics::METRIC_RAINFALL;

const KENYA: u64 = 1107;

fn live_client() -> GroClient {
    let token = config::load_token().expect("GROAPI_TOKEN must be set");
    GroClient::new(DEFAULT_API_HOST, &token, Duration::from_secs(60), DEFAULT_MAX_RETRIES)
        .expect("client should build")
}

#[test]
#[ignore]
fn test_region_name_resolves() {
    let client = live_client();
    let name = client
        .display_name(EntityKind::Region, KENYA)
        .expect("Kenya should resolve");
    assert_eq!(name, "Kenya");
}

#[test]
#[ignore]
fn test_provinces_of_kenya() {
    let client = live_client();
    let provinces = client
        .descendant_regions(KENYA, REGION_LEVEL_PROVINCE)
        .expect("hierarchy walk should succeed");
    println!("{} provinces", provinces.len());
    assert!(!provinces.is_empty());
}

#[test]
#[ignore]
fn test_rainfall_series_is_ordered() {
    let client = live_client();
    let selection = SeriesSelection {
        metric_id: METRIC_RAINFALL,
        item_id: 2039,
        region_id: KENYA,
        frequency_id: 1,
        source_id: 35,
        unit_id: None,
    };
    let series = client.fetch_series(&selection).expect("rainfall should be available");
    println!("{} points, newest {}", series.len(), series.last().end_date);
    assert!(series
        .points()
        .windows(2)
        .all(|pair| pair[0].end_date <= pair[1].end_date));
}
