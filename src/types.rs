use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Raw decoded payload as returned from the directory service
pub type SourceTree = serde_json::Value;

/// Where a show sits in its run, relative to the source's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Upcoming,
    Running,
    Finished,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Upcoming => "UPCOMING",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Finished => "FINISHED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UPCOMING" => Some(LifecycleState::Upcoming),
            "RUNNING" => Some(LifecycleState::Running),
            "FINISHED" => Some(LifecycleState::Finished),
            _ => None,
        }
    }
}

/// One listing stub from a region/page query. Never persisted; consumed by
/// the ingester to decide whether a detail fetch is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowListingEntry {
    pub show_id: String,
    pub venue_name: String,
    pub region_label: String,
}

/// Full show row as persisted in the store, keyed by the source-assigned
/// `show_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowRecord {
    pub show_id: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub region_label: String,
    pub venue_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cast: String,
    pub creator: String,
    pub runtime: String,
    pub age_rating: String,
    pub company: String,
    pub price: String,
    pub description: String,
    pub state: LifecycleState,
    pub schedule: String,
    pub poster_url: String,
    pub detail_image_urls: Vec<String>,
    pub rank: Option<i64>,
    pub avg_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inclusive date range a listing crawl covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One row of the weekly ranking feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub show_id: String,
    pub rank: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_state_round_trips_through_text() {
        for state in [
            LifecycleState::Upcoming,
            LifecycleState::Running,
            LifecycleState::Finished,
        ] {
            assert_eq!(LifecycleState::parse(state.as_str()), Some(state));
        }
        assert_eq!(LifecycleState::parse("CANCELLED"), None);
    }
}
