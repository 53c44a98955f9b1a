use crate::client::{PostcodeLookup, PostcodesIoClient};
use crate::config::Config;
use crate::dispatcher;
use crate::error::Result;
use crate::report::{self, RunSummary};
use crate::source;
use crate::store::LocationStore;
use crate::validate;
use std::fs;
use std::sync::Arc;
use tracing::info;

/// Runs the full enrichment pipeline against the live lookup service.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let client = Arc::new(PostcodesIoClient::new(
        &config.enrichment.base_url,
        config.lookup_timeout(),
    )?);
    run_with_client(config, client).await
}

/// Pipeline entry with an injected lookup implementation.
///
/// Stages run strictly left to right: source → validate → enrich →
/// persist → report, with a full join barrier after enrichment. Only
/// source and storage failures abort the run; per-record failures are
/// carried through as data.
pub async fn run_with_client(
    config: &Config,
    client: Arc<dyn PostcodeLookup>,
) -> Result<RunSummary> {
    info!("starting enrichment run");

    let rows = source::read_rows(&config.source.input_path)?;
    let cleaned = validate::clean(&rows, config.enrichment.max_coords);

    fs::create_dir_all(&config.output.dir)?;
    let error_log = config.output.dir.join(report::ERROR_LOG_FILE);
    if error_log.exists() {
        fs::remove_file(&error_log)?;
    }

    let results =
        dispatcher::enrich_all(client, &cleaned.records, config.enrichment.max_workers).await;
    info!("enrichment finished: {} lookups issued", results.len());

    let mut store = LocationStore::open(&config.storage.db_path)?;
    store.insert_results(&results)?;

    let summary = RunSummary::compute(&results, &cleaned.stats);
    report::write_enriched_csv(
        &config.output.dir.join(report::ENRICHED_EXPORT_FILE),
        &results,
    )?;
    report::write_summary(&config.output.dir.join(report::SUMMARY_FILE), &summary)?;
    report::append_error_log(&error_log, &results)?;

    info!(
        "run complete: {} processed, coverage {:.2}%",
        summary.processed,
        summary.coverage_pct()
    );
    Ok(summary)
}

/// Regenerates the report artifacts from the locations table without
/// issuing any lookups.
pub fn regenerate_report(config: &Config) -> Result<RunSummary> {
    let store = LocationStore::open(&config.storage.db_path)?;
    let rows = store.all_rows()?;
    info!("regenerating report from {} stored rows", rows.len());

    fs::create_dir_all(&config.output.dir)?;
    let summary = RunSummary::from_rows(&rows);
    report::write_enriched_csv_from_rows(
        &config.output.dir.join(report::ENRICHED_EXPORT_FILE),
        &rows,
    )?;
    report::write_summary(&config.output.dir.join(report::SUMMARY_FILE), &summary)?;
    Ok(summary)
}
