use std::error::Error;
use std::time::Duration;

use geoalert_service::batch::BatchRunner;
use geoalert_service::config::{self, AppConfig, BatchConfig};
use geoalert_service::ingest::gro::GroClient;
use geoalert_service::ingest::RegionHierarchy;
use geoalert_service::logging::{self, Stage};

fn main() -> Result<(), Box<dyn Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config: AppConfig = config::load_config(&config_path)?;

    logging::init_logger(
        config.logging.log_level(),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );
    logging::info(
        Stage::System,
        None,
        &format!("loaded {} batches from {}", config.batches.len(), config_path),
    );

    let token = config::load_token()?;
    let client = GroClient::new(
        &config.api.host,
        &token,
        Duration::from_secs(config.api.timeout_secs),
        config.api.max_retries,
    )?;
    let runner = BatchRunner::new(&client, config.alerts);

    for batch in &config.batches {
        run_one(&client, &runner, batch);
    }

    Ok(())
}

/// Resolves the batch's regions, runs it and prints a non-empty report.
/// A failure to resolve regions skips this batch only.
fn run_one(client: &GroClient, runner: &BatchRunner<'_>, batch: &BatchConfig) {
    let regions = match client.descendant_regions(batch.parent_region_id, batch.region_level) {
        Ok(regions) => regions,
        Err(e) => {
            logging::log_ingest_failure(
                &batch.parent_region_id.to_string(),
                &format!("region lookup for '{}'", batch.title),
                &e,
            );
            return;
        }
    };
    logging::info(
        Stage::Batch,
        Some(&batch.parent_region_id.to_string()),
        &format!("{}: {} regions", batch.title, regions.len()),
    );

    let report = runner.fetch_and_run(client, &batch.selections(&regions), &batch.title);
    if !report.is_empty() {
        println!("{}\n", report);
    }
}
