use crate::error::{Result, SyncError};
use crate::geocoder::{VenueGeocoder, VenuePoint};
use crate::source::{normalize_list, SourceFetch, LISTING_ENDPOINT};
use crate::types::{LifecycleState, ShowRecord};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct ShowDetailFetcher {
    source: Arc<dyn SourceFetch>,
    geocoder: VenueGeocoder,
}

impl ShowDetailFetcher {
    pub fn new(source: Arc<dyn SourceFetch>, geocoder: VenueGeocoder) -> Self {
        Self { source, geocoder }
    }

    /// Builds a complete ShowRecord for one listing stub. The show detail
    /// record and the venue coordinates are fetched concurrently; a failure
    /// in either fails the whole operation, so no partial record escapes.
    #[instrument(skip(self))]
    pub async fn fetch(
        &self,
        show_id: &str,
        venue_name: &str,
        region_label: &str,
    ) -> Result<ShowRecord> {
        let endpoint = format!("{}/{}", LISTING_ENDPOINT, show_id);
        let (tree, point) = tokio::try_join!(
            self.source.fetch(&endpoint, &[]),
            self.geocoder.resolve(venue_name),
        )?;

        debug!(
            "Venue '{}' sits at ({}, {}) with {} seats",
            venue_name, point.latitude, point.longitude, point.seat_count
        );

        let entry = normalize_list(&tree["dbs"]["db"])
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::MissingField(format!("no detail record for {}", show_id)))?;

        build_record(entry, show_id, venue_name, region_label, point)
    }
}

fn build_record(
    entry: &Value,
    show_id: &str,
    venue_name: &str,
    region_label: &str,
    point: VenuePoint,
) -> Result<ShowRecord> {
    let title = entry["prfnm"]
        .as_str()
        .ok_or_else(|| SyncError::MissingField("prfnm not found".into()))?
        .trim()
        .to_string();

    let start_date = entry["prfpdfrom"]
        .as_str()
        .ok_or_else(|| SyncError::MissingField("prfpdfrom not found".into()))?;
    let start_date = parse_source_date(start_date)?;
    let end_date = entry["prfpdto"]
        .as_str()
        .ok_or_else(|| SyncError::MissingField("prfpdto not found".into()))?;
    let end_date = parse_source_date(end_date)?;

    let now = Utc::now();

    Ok(ShowRecord {
        show_id: show_id.to_string(),
        title,
        start_date,
        end_date,
        region_label: region_label.to_string(),
        venue_name: venue_name.to_string(),
        latitude: finite_or_none(point.latitude),
        longitude: finite_or_none(point.longitude),
        cast: text_field(entry, "prfcast"),
        creator: text_field(entry, "prfcrew"),
        runtime: text_field(entry, "prfruntime"),
        age_rating: text_field(entry, "prfage"),
        company: text_field(entry, "entrpsnm"),
        price: text_field(entry, "pcseguidance"),
        description: text_field(entry, "sty"),
        state: LifecycleState::Upcoming,
        schedule: text_field(entry, "dtguidance"),
        poster_url: text_field(entry, "poster"),
        detail_image_urls: image_list(&entry["styurls"]["styurl"]),
        rank: None,
        avg_rating: None,
        created_at: now,
        updated_at: now,
    })
}

/// Run dates arrive as dot-delimited text like "2024.06.01".
fn parse_source_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y.%m.%d").map_err(|_| SyncError::BadDate(text.into()))
}

fn text_field(entry: &Value, key: &str) -> String {
    entry[key].as_str().unwrap_or_default().trim().to_string()
}

/// NaN from the geocoder means the venue had no usable coordinate.
fn finite_or_none(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

fn image_list(value: &Value) -> Vec<String> {
    normalize_list(value)
        .into_iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
