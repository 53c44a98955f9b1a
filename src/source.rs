use crate::error::{EnricherError, Result};
use std::path::Path;
use tracing::info;

/// One row of the input file, still unparsed.
#[derive(Debug, Clone)]
pub struct RawCoordinateRow {
    pub lat: String,
    pub lon: String,
}

const REQUIRED_HEADERS: [&str; 2] = ["lat", "lon"];

/// Reads the delimited input file into raw rows, preserving file order.
///
/// Column order is irrelevant and extra columns are ignored; only the
/// `lat`/`lon` headers are required. A missing file or missing header is
/// fatal, a short row is not (it surfaces as a validation drop later).
pub fn read_rows(path: &Path) -> Result<Vec<RawCoordinateRow>> {
    if !path.exists() {
        return Err(EnricherError::SourceNotFound(path.display().to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let positions = REQUIRED_HEADERS
        .iter()
        .map(|required| {
            headers.iter().position(|h| h.trim() == *required).ok_or_else(|| {
                EnricherError::SourceMalformed(format!("missing required column: {required}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let (lat_idx, lon_idx) = (positions[0], positions[1]);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawCoordinateRow {
            lat: record.get(lat_idx).unwrap_or("").trim().to_string(),
            lon: record.get(lon_idx).unwrap_or("").trim().to_string(),
        });
    }

    info!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
