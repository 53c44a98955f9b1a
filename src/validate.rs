use crate::source::RawCoordinateRow;
use crate::types::{CoordinateRecord, ValidationStats};
use std::collections::HashSet;
use tracing::info;

/// Output of the cleaning pass: what survived, and why the rest did not.
#[derive(Debug, Clone)]
pub struct CleanedSet {
    pub records: Vec<CoordinateRecord>,
    pub stats: ValidationStats,
}

/// Parses, range-checks, deduplicates and caps the raw rows.
///
/// First-seen order is preserved. Each dropped row increments exactly one
/// counter in the returned stats; drops are never fatal.
pub fn clean(rows: &[RawCoordinateRow], max_coords: usize) -> CleanedSet {
    let mut stats = ValidationStats {
        total_rows: rows.len(),
        ..Default::default()
    };
    let mut seen: HashSet<(u64, u64)> = HashSet::new();
    let mut records = Vec::new();

    for row in rows {
        let (lat, lon) = match (parse_coordinate(&row.lat), parse_coordinate(&row.lon)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                stats.parse_failures += 1;
                continue;
            }
        };

        let record = CoordinateRecord::new(lat, lon);
        if !record.in_range() {
            stats.out_of_range += 1;
            continue;
        }
        if !seen.insert(record.dedupe_key()) {
            stats.duplicates += 1;
            continue;
        }
        if records.len() >= max_coords {
            stats.over_cap += 1;
            continue;
        }
        records.push(record);
    }

    info!(
        "validation kept {} of {} rows ({} dropped)",
        records.len(),
        stats.total_rows,
        stats.dropped()
    );
    CleanedSet { records, stats }
}

fn parse_coordinate(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
