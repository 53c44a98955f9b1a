use crate::error::Result;
use crate::store::LocationRow;
use crate::types::{EnrichmentResult, ValidationStats};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use tracing::info;

pub const ENRICHED_EXPORT_FILE: &str = "enriched_data.csv";
pub const SUMMARY_FILE: &str = "report_summary.txt";
pub const ERROR_LOG_FILE: &str = "api_errors.log";

const TOP_POSTCODES: usize = 10;

/// Aggregate statistics for one enrichment run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub with_postcode: usize,
    pub without_postcode: usize,
    pub validation_dropped: usize,
    /// Most frequent postcodes, count descending then postcode ascending.
    pub top_postcodes: Vec<(String, usize)>,
}

impl RunSummary {
    pub fn compute(results: &[EnrichmentResult], stats: &ValidationStats) -> Self {
        Self::from_postcodes(
            results.len(),
            results.iter().filter_map(|r| r.postcode()),
            stats.dropped(),
        )
    }

    /// Summary over rows read back from the locations table, for report
    /// regeneration without a fresh run.
    pub fn from_rows(rows: &[LocationRow]) -> Self {
        Self::from_postcodes(
            rows.len(),
            rows.iter().filter_map(|r| r.nearest_postcode.as_deref()),
            0,
        )
    }

    fn from_postcodes<'a>(
        processed: usize,
        postcodes: impl Iterator<Item = &'a str>,
        validation_dropped: usize,
    ) -> Self {
        let mut frequencies: HashMap<&str, usize> = HashMap::new();
        let mut with_postcode = 0usize;
        for postcode in postcodes {
            with_postcode += 1;
            *frequencies.entry(postcode).or_insert(0) += 1;
        }

        let mut top: Vec<(String, usize)> = frequencies
            .into_iter()
            .map(|(postcode, count)| (postcode.to_string(), count))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(TOP_POSTCODES);

        Self {
            processed,
            with_postcode,
            without_postcode: processed - with_postcode,
            validation_dropped,
            top_postcodes: top,
        }
    }

    /// Fraction of processed coordinates that received a postcode, as a
    /// percentage rounded to two decimals.
    pub fn coverage_pct(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        (self.with_postcode as f64 / self.processed as f64 * 10_000.0).round() / 100.0
    }
}

/// Writes the enriched export, one row per processed coordinate, postcode
/// blank on failure.
pub fn write_enriched_csv(path: &Path, results: &[EnrichmentResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["lat", "lon", "nearest_postcode"])?;
    for result in results {
        writer.write_record([
            result.coordinate.lat.to_string(),
            result.coordinate.lon.to_string(),
            result.postcode().unwrap_or("").to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Export variant fed from the locations table.
pub fn write_enriched_csv_from_rows(path: &Path, rows: &[LocationRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["lat", "lon", "nearest_postcode"])?;
    for row in rows {
        writer.write_record([
            row.lat.to_string(),
            row.lon.to_string(),
            row.nearest_postcode.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "Enriched data report");
    let _ = writeln!(
        out,
        "Generated at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Total coordinates: {}", summary.processed);
    let _ = writeln!(out, "With postcode: {}", summary.with_postcode);
    let _ = writeln!(out, "Without postcode: {}", summary.without_postcode);
    let _ = writeln!(out, "Coverage: {:.2}%", summary.coverage_pct());
    let _ = writeln!(
        out,
        "Dropped during validation: {}",
        summary.validation_dropped
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Top {} postcodes:", TOP_POSTCODES);
    if summary.top_postcodes.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (postcode, count) in &summary.top_postcodes {
        let _ = writeln!(out, "  {}: {}", postcode, count);
    }

    fs::write(path, out)?;
    info!("summary report written to {}", path.display());
    Ok(())
}

/// Appends one `lat,lon,message` line per failed lookup. The file is only
/// created once there is at least one failure to record.
pub fn append_error_log(path: &Path, results: &[EnrichmentResult]) -> Result<()> {
    if !results.iter().any(|r| r.error().is_some()) {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    for result in results {
        if let Some(message) = result.error() {
            writeln!(
                file,
                "{},{},{}",
                result.coordinate.lat, result.coordinate.lon, message
            )?;
        }
    }
    info!("lookup failures recorded in {}", path.display());
    Ok(())
}
