use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::types::SourceTree;
use async_trait::async_trait;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, instrument};

/// Show listing lives here; show detail at `pblprfr/{show_id}`.
pub const LISTING_ENDPOINT: &str = "pblprfr";
/// Venue search lives here; venue detail at `prfplc/{venue_id}`.
pub const VENUE_ENDPOINT: &str = "prfplc";
/// Weekly box-office ranking feed.
pub const BOXOFFICE_ENDPOINT: &str = "boxoffice";

/// Read access to the directory service. Everything that talks to the
/// network goes through this seam, so jobs can be exercised against canned
/// payloads in tests.
#[async_trait]
pub trait SourceFetch: Send + Sync {
    /// Issues a GET against `endpoint` (a path relative to the service root)
    /// and decodes the response body into a JSON tree.
    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<SourceTree>;
}

pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SourceClient {
    /// Builds the production client. The service key comes from the
    /// `KOPIS_SERVICE_KEY` environment variable, never from config files.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let service_key = env::var("KOPIS_SERVICE_KEY").map_err(|_| {
            SyncError::Config("KOPIS_SERVICE_KEY environment variable not set".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }
}

#[async_trait]
impl SourceFetch for SourceClient {
    #[instrument(skip(self, params))]
    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<SourceTree> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} with {} extra params", url, params.len());

        let response = self
            .http
            .get(&url)
            .query(&[("service", self.service_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| SyncError::Fetch {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SyncError::Fetch {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

        serde_json::from_slice(&body).map_err(|e| SyncError::Decode {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}

/// The service collapses single-element lists into a bare value, omits empty
/// ones, and occasionally ships them as a blank string. Flattens all of
/// those shapes into a uniform list.
pub fn normalize_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        single => vec![single],
    }
}
