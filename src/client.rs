use crate::error::Result;
use crate::types::{CoordinateRecord, EnrichmentResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Reverse-geocode seam the dispatcher fans out over.
#[async_trait]
pub trait PostcodeLookup: Send + Sync {
    /// Resolve one coordinate to its nearest postcode. Failures come back
    /// as data in the result; this never errors past the boundary.
    async fn lookup(&self, coordinate: CoordinateRecord) -> EnrichmentResult;
}

/// Client for the postcodes.io reverse geocoding endpoint.
///
/// One GET per coordinate with a flat timeout and no retries.
pub struct PostcodesIoClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    status: u16,
    result: Option<Vec<ReverseGeocodeHit>>,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeHit {
    postcode: String,
}

impl PostcodesIoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, coordinate: CoordinateRecord) -> std::result::Result<String, String> {
        let url = format!(
            "{}/postcodes?lon={}&lat={}",
            self.base_url, coordinate.lon, coordinate.lat
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                "timeout contacting API".to_string()
            } else {
                format!("network error: {e}")
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let body: ReverseGeocodeResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                "timeout contacting API".to_string()
            } else {
                format!("invalid response body: {e}")
            }
        })?;

        match body.result.as_deref() {
            Some([first, ..]) if body.status == 200 => Ok(first.postcode.clone()),
            _ => Err("response contained no results".to_string()),
        }
    }
}

#[async_trait]
impl PostcodeLookup for PostcodesIoClient {
    async fn lookup(&self, coordinate: CoordinateRecord) -> EnrichmentResult {
        match self.fetch(coordinate).await {
            Ok(postcode) => {
                debug!(
                    "resolved ({}, {}) to {}",
                    coordinate.lat, coordinate.lon, postcode
                );
                EnrichmentResult::found(coordinate, postcode)
            }
            Err(message) => EnrichmentResult::failed(coordinate, message),
        }
    }
}
