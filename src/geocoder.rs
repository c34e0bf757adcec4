use crate::error::{Result, SyncError};
use crate::source::{normalize_list, SourceFetch, VENUE_ENDPOINT};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Coordinates (and hall size) for one venue, straight from the venue
/// directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VenuePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub seat_count: f64,
}

pub struct VenueGeocoder {
    source: Arc<dyn SourceFetch>,
}

impl VenueGeocoder {
    pub fn new(source: Arc<dyn SourceFetch>) -> Self {
        Self { source }
    }

    /// Resolves a venue name to coordinates via a two-step lookup: a
    /// name-scoped search for the venue id, then the venue detail record.
    #[instrument(skip(self))]
    pub async fn resolve(&self, venue_name: &str) -> Result<VenuePoint> {
        let search = self
            .source
            .fetch(
                VENUE_ENDPOINT,
                &[
                    ("shprfnmfct", venue_name.to_string()),
                    ("cpage", "1".to_string()),
                    ("rows", "1".to_string()),
                ],
            )
            .await?;

        let first = normalize_list(&search["dbs"]["db"])
            .into_iter()
            .next()
            .ok_or_else(|| {
                warn!("No venue matched '{}'", venue_name);
                SyncError::VenueNotFound(venue_name.to_string())
            })?;
        let venue_id = first["mt13id"]
            .as_str()
            .ok_or_else(|| SyncError::MissingField("mt13id not found".into()))?;

        debug!("Venue '{}' resolved to id {}", venue_name, venue_id);

        let detail = self
            .source
            .fetch(&format!("{}/{}", VENUE_ENDPOINT, venue_id), &[])
            .await?;

        let entry = normalize_list(&detail["dbs"]["db"])
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::VenueNotFound(venue_name.to_string()))?;

        Ok(VenuePoint {
            latitude: numeric_text(&entry["la"]),
            longitude: numeric_text(&entry["lo"]),
            seat_count: numeric_text(&entry["seatscale"]),
        })
    }
}

/// Numeric fields arrive as text. Malformed text maps to NaN so a bad
/// coordinate degrades the record instead of failing the whole lookup.
fn numeric_text(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}
