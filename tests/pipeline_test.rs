use anyhow::Result;
use async_trait::async_trait;
use postcode_enricher::client::PostcodeLookup;
use postcode_enricher::config::Config;
use postcode_enricher::pipeline;
use postcode_enricher::store::LocationStore;
use postcode_enricher::types::{CoordinateRecord, EnrichmentResult};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

/// Deterministic stand-in for the lookup service: London succeeds,
/// anything north of it times out.
struct StubLookup;

#[async_trait]
impl PostcodeLookup for StubLookup {
    async fn lookup(&self, coordinate: CoordinateRecord) -> EnrichmentResult {
        if coordinate.lat > 51.6 {
            EnrichmentResult::failed(coordinate, "timeout contacting API")
        } else {
            EnrichmentResult::found(coordinate, "SW1A 2AA")
        }
    }
}

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.source.input_path = dir.join("coords.csv");
    config.storage.db_path = dir.join("db_postcodes.db");
    config.output.dir = dir.join("out");
    config.enrichment.max_workers = 4;
    config
}

#[tokio::test]
async fn test_full_pipeline_run() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    fs::write(
        &config.source.input_path,
        "lat,lon\n51.5074,-0.1278\n200.0,10.0\n51.5074,-0.1278\n51.7,-0.2\n",
    )?;

    let summary = pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;

    // Out-of-range row and duplicate dropped, two coordinates enriched
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.with_postcode, 1);
    assert_eq!(summary.without_postcode, 1);
    assert_eq!(summary.validation_dropped, 2);
    assert_eq!(summary.coverage_pct(), 50.0);

    let enriched = fs::read_to_string(config.output.dir.join("enriched_data.csv"))?;
    assert!(enriched.contains("51.5074,-0.1278,SW1A 2AA"));
    assert!(enriched.contains("51.7,-0.2,"));

    let errors = fs::read_to_string(config.output.dir.join("api_errors.log"))?;
    assert_eq!(errors.trim(), "51.7,-0.2,timeout contacting API");

    let report = fs::read_to_string(config.output.dir.join("report_summary.txt"))?;
    assert!(report.contains("Total coordinates: 2"));
    assert!(report.contains("Coverage: 50.00%"));
    assert!(report.contains("SW1A 2AA: 1"));

    let store = LocationStore::open(&config.storage.db_path)?;
    assert_eq!(store.row_count()?, 2);

    Ok(())
}

#[tokio::test]
async fn test_second_run_is_idempotent_for_persistence() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    fs::write(
        &config.source.input_path,
        "lat,lon\n51.5074,-0.1278\n53.4808,-2.2426\n",
    )?;

    pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;
    pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;

    let store = LocationStore::open(&config.storage.db_path)?;
    assert_eq!(store.row_count()?, 2);
    Ok(())
}

#[tokio::test]
async fn test_stale_error_log_is_removed_at_run_start() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    fs::write(&config.source.input_path, "lat,lon\n51.5074,-0.1278\n")?;

    fs::create_dir_all(&config.output.dir)?;
    fs::write(
        config.output.dir.join("api_errors.log"),
        "0.0,0.0,stale entry from a previous run\n",
    )?;

    pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;

    // The stub succeeds for London, so no new log should exist at all
    assert!(!config.output.dir.join("api_errors.log").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_input_aborts_before_enrichment() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());

    let result = pipeline::run_with_client(&config, Arc::new(StubLookup)).await;
    assert!(result.is_err());
    // Nothing downstream should have been produced
    assert!(!config.storage.db_path.exists());
    assert!(!config.output.dir.join("enriched_data.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_cap_limits_enrichment_to_first_n_rows() -> Result<()> {
    let dir = tempdir()?;
    let mut config = test_config(dir.path());
    config.enrichment.max_coords = 10;

    let mut input = String::from("lat,lon\n");
    for i in 0..25 {
        input.push_str(&format!("51.0,{}.5\n", i));
    }
    fs::write(&config.source.input_path, input)?;

    let summary = pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;
    assert_eq!(summary.processed, 10);

    let store = LocationStore::open(&config.storage.db_path)?;
    let rows = store.all_rows()?;
    assert_eq!(rows.len(), 10);
    // First ten in source order
    assert_eq!(rows[0].lon, 0.5);
    assert_eq!(rows[9].lon, 9.5);
    Ok(())
}

#[tokio::test]
async fn test_report_regeneration_matches_database_contents() -> Result<()> {
    let dir = tempdir()?;
    let config = test_config(dir.path());
    fs::write(
        &config.source.input_path,
        "lat,lon\n51.5074,-0.1278\n51.7,-0.2\n",
    )?;

    pipeline::run_with_client(&config, Arc::new(StubLookup)).await?;

    // Wipe the artifacts, then rebuild them from the database alone
    fs::remove_file(config.output.dir.join("enriched_data.csv"))?;
    fs::remove_file(config.output.dir.join("report_summary.txt"))?;

    let summary = pipeline::regenerate_report(&config)?;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.with_postcode, 1);
    assert_eq!(summary.coverage_pct(), 50.0);

    let enriched = fs::read_to_string(config.output.dir.join("enriched_data.csv"))?;
    assert!(enriched.contains("51.5074,-0.1278,SW1A 2AA"));
    Ok(())
}
