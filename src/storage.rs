use crate::error::Result;
use crate::types::{LifecycleState, ShowRecord};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What an insert attempt concluded. `AlreadyExists` is a normal outcome,
/// not an error: concurrent entry tasks and overlapping runs both funnel
/// into the store's `show_id` uniqueness guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    AlreadyExists,
}

/// Storage trait for persisted shows. Bulk update methods return the number
/// of rows they touched.
#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn contains(&self, show_id: &str) -> Result<bool>;

    /// Inserts the record unless a row with the same `show_id` already
    /// exists. Never overwrites.
    async fn insert_show(&self, show: &ShowRecord) -> Result<InsertOutcome>;

    async fn get_show(&self, show_id: &str) -> Result<Option<ShowRecord>>;

    async fn list_shows(&self) -> Result<Vec<ShowRecord>>;

    /// Marks every show whose run ended before `today` as FINISHED.
    async fn mark_finished_before(&self, today: NaiveDate) -> Result<u64>;

    /// Marks every show with `start_date <= today < end_date` as RUNNING.
    async fn mark_running_at(&self, today: NaiveDate) -> Result<u64>;

    /// Sets the weekly rank for one show. Returns 0 when no such show is
    /// stored, which callers treat as a no-op rather than a failure.
    async fn set_rank(&self, show_id: &str, rank: i64) -> Result<u64>;
}

/// In-memory store for development and testing.
pub struct InMemoryShowStore {
    shows: Arc<Mutex<HashMap<String, ShowRecord>>>,
}

impl InMemoryShowStore {
    pub fn new() -> Self {
        Self {
            shows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryShowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShowStore for InMemoryShowStore {
    async fn contains(&self, show_id: &str) -> Result<bool> {
        let shows = self.shows.lock().unwrap();
        Ok(shows.contains_key(show_id))
    }

    async fn insert_show(&self, show: &ShowRecord) -> Result<InsertOutcome> {
        let mut shows = self.shows.lock().unwrap();
        if shows.contains_key(&show.show_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        shows.insert(show.show_id.clone(), show.clone());
        debug!("Stored show {} ({})", show.show_id, show.title);
        Ok(InsertOutcome::Created)
    }

    async fn get_show(&self, show_id: &str) -> Result<Option<ShowRecord>> {
        let shows = self.shows.lock().unwrap();
        Ok(shows.get(show_id).cloned())
    }

    async fn list_shows(&self) -> Result<Vec<ShowRecord>> {
        let shows = self.shows.lock().unwrap();
        let mut all: Vec<ShowRecord> = shows.values().cloned().collect();
        all.sort_by(|a, b| a.show_id.cmp(&b.show_id));
        Ok(all)
    }

    async fn mark_finished_before(&self, today: NaiveDate) -> Result<u64> {
        let mut shows = self.shows.lock().unwrap();
        let mut touched = 0;
        for show in shows.values_mut().filter(|s| s.end_date < today) {
            show.state = LifecycleState::Finished;
            show.updated_at = Utc::now();
            touched += 1;
        }
        Ok(touched)
    }

    async fn mark_running_at(&self, today: NaiveDate) -> Result<u64> {
        let mut shows = self.shows.lock().unwrap();
        let mut touched = 0;
        for show in shows
            .values_mut()
            .filter(|s| s.start_date <= today && today < s.end_date)
        {
            show.state = LifecycleState::Running;
            show.updated_at = Utc::now();
            touched += 1;
        }
        Ok(touched)
    }

    async fn set_rank(&self, show_id: &str, rank: i64) -> Result<u64> {
        let mut shows = self.shows.lock().unwrap();
        match shows.get_mut(show_id) {
            Some(show) => {
                show.rank = Some(rank);
                show.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_show(show_id: &str, start: NaiveDate, end: NaiveDate) -> ShowRecord {
        ShowRecord {
            show_id: show_id.to_string(),
            title: format!("Show {}", show_id),
            start_date: start,
            end_date: end,
            region_label: "서울".to_string(),
            venue_name: "예술의전당".to_string(),
            latitude: Some(37.48),
            longitude: Some(127.01),
            cast: String::new(),
            creator: String::new(),
            runtime: String::new(),
            age_rating: String::new(),
            company: String::new(),
            price: String::new(),
            description: String::new(),
            state: LifecycleState::Upcoming,
            schedule: String::new(),
            poster_url: String::new(),
            detail_image_urls: Vec::new(),
            rank: None,
            avg_rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn insert_show_reports_duplicates() {
        let store = InMemoryShowStore::new();
        let show = sample_show("PF001", date(2024, 6, 1), date(2024, 6, 30));

        assert_eq!(store.insert_show(&show).await.unwrap(), InsertOutcome::Created);
        assert_eq!(
            store.insert_show(&show).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(store.list_shows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bulk_updates_follow_date_predicates() {
        let store = InMemoryShowStore::new();
        let today = date(2024, 6, 15);
        store
            .insert_show(&sample_show("PF001", date(2024, 5, 1), date(2024, 5, 31)))
            .await
            .unwrap();
        store
            .insert_show(&sample_show("PF002", date(2024, 6, 1), date(2024, 6, 30)))
            .await
            .unwrap();
        store
            .insert_show(&sample_show("PF003", date(2024, 7, 1), date(2024, 7, 31)))
            .await
            .unwrap();

        assert_eq!(store.mark_finished_before(today).await.unwrap(), 1);
        assert_eq!(store.mark_running_at(today).await.unwrap(), 1);

        let states: Vec<LifecycleState> = store
            .list_shows()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.state)
            .collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::Finished,
                LifecycleState::Running,
                LifecycleState::Upcoming
            ]
        );
    }

    #[tokio::test]
    async fn set_rank_reports_missing_shows_as_zero_rows() {
        let store = InMemoryShowStore::new();
        store
            .insert_show(&sample_show("PF001", date(2024, 6, 1), date(2024, 6, 30)))
            .await
            .unwrap();

        assert_eq!(store.set_rank("PF001", 3).await.unwrap(), 1);
        assert_eq!(store.set_rank("PF999", 1).await.unwrap(), 0);
        assert_eq!(
            store.get_show("PF001").await.unwrap().unwrap().rank,
            Some(3)
        );
    }
}
