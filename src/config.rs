use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    /// Genre code the crawl is scoped to (GGGA = musical).
    pub genre_code: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Rows requested per region per page; also the page-continuation threshold.
    pub page_size: u32,
    pub page_delay_ms: u64,
    /// Crawl window reaches this many days behind today.
    pub lookback_days: i64,
    /// Crawl window reaches this many days past today.
    pub lookahead_days: i64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        let config_content = fs::read_to_string(config_path)
            .map_err(|e| SyncError::Config(format!("Failed to read config file '{}': {}", config_path, e)))?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
