use crate::error::{EnricherError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "enricher.toml";

/// Full configuration for one pipeline run. Loaded from a TOML file when
/// present, every field falls back to the defaults below; CLI flags are
/// applied on top by `main`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub enrichment: EnrichmentConfig,
    pub storage: StorageConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub input_path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("postcodesgeo.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Cap on how many validated coordinates are enriched in one run.
    pub max_coords: usize,
    /// Bound on concurrent lookups.
    pub max_workers: usize,
    /// Per-lookup timeout in seconds.
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_coords: 20_000,
            max_workers: 17,
            timeout_secs: 5,
            base_url: "https://api.postcodes.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db_postcodes.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, then applies environment overrides.
    ///
    /// An explicitly requested file must exist; the default path is
    /// optional and silently falls back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                EnricherError::Config(format!(
                    "failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str(&content)?
        } else if explicit {
            return Err(EnricherError::Config(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        } else {
            Config::default()
        };

        if let Ok(base_url) = std::env::var("POSTCODE_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.enrichment.base_url = base_url;
            }
        }

        Ok(config)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment.timeout_secs)
    }
}
