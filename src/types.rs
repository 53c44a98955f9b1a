use serde::{Deserialize, Serialize};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRecord {
    pub lat: f64,
    pub lon: f64,
}

impl CoordinateRecord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Exact-pair identity used for deduplication. Bit patterns keep
    /// -0.0 and 0.0 distinct, matching the storage uniqueness constraint.
    pub fn dedupe_key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }

    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Outcome of a single postcode lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LookupOutcome {
    /// The service resolved the coordinate to a postcode.
    Found(String),
    /// The lookup failed; the message is recorded in the error log.
    Failed(String),
}

/// One coordinate paired with its lookup outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub coordinate: CoordinateRecord,
    pub outcome: LookupOutcome,
}

impl EnrichmentResult {
    pub fn found(coordinate: CoordinateRecord, postcode: impl Into<String>) -> Self {
        Self {
            coordinate,
            outcome: LookupOutcome::Found(postcode.into()),
        }
    }

    pub fn failed(coordinate: CoordinateRecord, message: impl Into<String>) -> Self {
        Self {
            coordinate,
            outcome: LookupOutcome::Failed(message.into()),
        }
    }

    pub fn postcode(&self) -> Option<&str> {
        match &self.outcome {
            LookupOutcome::Found(postcode) => Some(postcode),
            LookupOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            LookupOutcome::Found(_) => None,
            LookupOutcome::Failed(message) => Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, LookupOutcome::Found(_))
    }
}

/// Per-category counts of rows removed during validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub total_rows: usize,
    pub parse_failures: usize,
    pub out_of_range: usize,
    pub duplicates: usize,
    pub over_cap: usize,
}

impl ValidationStats {
    pub fn dropped(&self) -> usize {
        self.parse_failures + self.out_of_range + self.duplicates + self.over_cap
    }

    pub fn retained(&self) -> usize {
        self.total_rows - self.dropped()
    }
}
