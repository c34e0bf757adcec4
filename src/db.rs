use crate::error::{Result, SyncError};
use crate::storage::{InsertOutcome, ShowStore};
use crate::types::{LifecycleState, ShowRecord};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Builder, Connection, Database};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DEFAULT_DB_PATH: &str = "data/stagesync.db";

fn store_err(context: &str, e: impl std::fmt::Display) -> SyncError {
    SyncError::Store {
        message: format!("{context}: {e}"),
    }
}

pub struct DatabaseManager {
    db: Database,
}

impl DatabaseManager {
    /// Connects to Turso when `LIBSQL_URL` is set, otherwise falls back to a
    /// local database file.
    pub async fn new() -> Result<Self> {
        match env::var("LIBSQL_URL") {
            Ok(url) => {
                let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| SyncError::Store {
                    message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
                })?;

                info!("Connecting to remote database at {}", url);

                let db = Builder::new_remote(url, auth_token)
                    .build()
                    .await
                    .map_err(|e| store_err("Failed to connect to database", e))?;

                Ok(Self { db })
            }
            Err(_) => {
                let path =
                    env::var("STAGESYNC_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
                Self::open_local(&path).await
            }
        }
    }

    /// Opens (creating if needed) a local database file.
    pub async fn open_local(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        info!("Opening local database at {}", path);

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| store_err("Failed to open local database", e))?;

        Ok(Self { db })
    }

    pub fn get_connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| store_err("Failed to get database connection", e))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_connection()?;
        let migration_sql = include_str!("../migrations/001_create_shows.sql");

        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| store_err("Failed to run migrations", e))?;

        info!("Database migrations completed successfully");
        Ok(())
    }
}

/// libSQL-backed show store. Uniqueness of `show_id` is enforced by the
/// primary key, so overlapping ingestion runs cannot produce duplicates no
/// matter how their existence checks interleave.
pub struct LibsqlShowStore {
    db: Arc<DatabaseManager>,
}

impl LibsqlShowStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

const SHOW_COLUMNS: &str = "show_id, title, start_date, end_date, region, venue_name, \
     latitude, longitude, cast_members, creator, runtime, age_rating, company, price, \
     description, state, schedule, poster_url, detail_image_urls, rank, avg_rating, \
     created_at, updated_at";

fn row_to_show(row: &libsql::Row) -> Result<ShowRecord> {
    let show_id: String = row.get(0).map_err(|e| store_err("Failed to get show_id", e))?;
    let title: String = row.get(1).map_err(|e| store_err("Failed to get title", e))?;

    let start_date: String = row
        .get(2)
        .map_err(|e| store_err("Failed to get start_date", e))?;
    let start_date = NaiveDate::parse_from_str(&start_date, "%Y-%m-%d")
        .map_err(|e| store_err("Stored start_date is not a date", e))?;
    let end_date: String = row
        .get(3)
        .map_err(|e| store_err("Failed to get end_date", e))?;
    let end_date = NaiveDate::parse_from_str(&end_date, "%Y-%m-%d")
        .map_err(|e| store_err("Stored end_date is not a date", e))?;

    let region_label: String = row.get(4).map_err(|e| store_err("Failed to get region", e))?;
    let venue_name: String = row
        .get(5)
        .map_err(|e| store_err("Failed to get venue_name", e))?;
    let latitude: Option<f64> = row.get(6).ok();
    let longitude: Option<f64> = row.get(7).ok();
    let cast: String = row
        .get(8)
        .map_err(|e| store_err("Failed to get cast_members", e))?;
    let creator: String = row.get(9).map_err(|e| store_err("Failed to get creator", e))?;
    let runtime: String = row
        .get(10)
        .map_err(|e| store_err("Failed to get runtime", e))?;
    let age_rating: String = row
        .get(11)
        .map_err(|e| store_err("Failed to get age_rating", e))?;
    let company: String = row
        .get(12)
        .map_err(|e| store_err("Failed to get company", e))?;
    let price: String = row.get(13).map_err(|e| store_err("Failed to get price", e))?;
    let description: String = row
        .get(14)
        .map_err(|e| store_err("Failed to get description", e))?;

    let state: String = row.get(15).map_err(|e| store_err("Failed to get state", e))?;
    let state = LifecycleState::parse(&state)
        .ok_or_else(|| store_err("Unknown lifecycle state", &state))?;

    let schedule: String = row
        .get(16)
        .map_err(|e| store_err("Failed to get schedule", e))?;
    let poster_url: String = row
        .get(17)
        .map_err(|e| store_err("Failed to get poster_url", e))?;

    let detail_image_urls: String = row
        .get(18)
        .map_err(|e| store_err("Failed to get detail_image_urls", e))?;
    let detail_image_urls: Vec<String> = serde_json::from_str(&detail_image_urls)
        .map_err(|e| store_err("Stored detail_image_urls is not a JSON list", e))?;

    let rank: Option<i64> = row.get(19).ok();
    let avg_rating: Option<f64> = row.get(20).ok();

    let created_at: String = row
        .get(21)
        .map_err(|e| store_err("Failed to get created_at", e))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| store_err("Stored created_at is not a timestamp", e))?
        .with_timezone(&Utc);
    let updated_at: String = row
        .get(22)
        .map_err(|e| store_err("Failed to get updated_at", e))?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| store_err("Stored updated_at is not a timestamp", e))?
        .with_timezone(&Utc);

    Ok(ShowRecord {
        show_id,
        title,
        start_date,
        end_date,
        region_label,
        venue_name,
        latitude,
        longitude,
        cast,
        creator,
        runtime,
        age_rating,
        company,
        price,
        description,
        state,
        schedule,
        poster_url,
        detail_image_urls,
        rank,
        avg_rating,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl ShowStore for LibsqlShowStore {
    async fn contains(&self, show_id: &str) -> Result<bool> {
        let conn = self.db.get_connection()?;

        let mut rows = conn
            .query(
                "SELECT 1 FROM shows WHERE show_id = ? LIMIT 1",
                libsql::params![show_id],
            )
            .await
            .map_err(|e| store_err("Failed to query show existence", e))?;

        let row = rows
            .next()
            .await
            .map_err(|e| store_err("Failed to read row", e))?;
        Ok(row.is_some())
    }

    async fn insert_show(&self, show: &ShowRecord) -> Result<InsertOutcome> {
        let conn = self.db.get_connection()?;

        let detail_image_urls = serde_json::to_string(&show.detail_image_urls)
            .map_err(|e| store_err("Failed to encode detail_image_urls", e))?;

        // ON CONFLICT DO NOTHING keeps the first write and reports zero
        // affected rows for the loser of an insert race.
        let affected = conn
            .execute(
                &format!(
                    "INSERT INTO shows ({SHOW_COLUMNS}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT(show_id) DO NOTHING"
                ),
                libsql::params![
                    show.show_id.as_str(),
                    show.title.as_str(),
                    show.start_date.to_string(),
                    show.end_date.to_string(),
                    show.region_label.as_str(),
                    show.venue_name.as_str(),
                    show.latitude,
                    show.longitude,
                    show.cast.as_str(),
                    show.creator.as_str(),
                    show.runtime.as_str(),
                    show.age_rating.as_str(),
                    show.company.as_str(),
                    show.price.as_str(),
                    show.description.as_str(),
                    show.state.as_str(),
                    show.schedule.as_str(),
                    show.poster_url.as_str(),
                    detail_image_urls,
                    show.rank,
                    show.avg_rating,
                    show.created_at.to_rfc3339(),
                    show.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| store_err("Failed to insert show", e))?;

        if affected == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Created)
        }
    }

    async fn get_show(&self, show_id: &str) -> Result<Option<ShowRecord>> {
        let conn = self.db.get_connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE show_id = ?"),
                libsql::params![show_id],
            )
            .await
            .map_err(|e| store_err("Failed to query show", e))?;

        match rows
            .next()
            .await
            .map_err(|e| store_err("Failed to read row", e))?
        {
            Some(row) => Ok(Some(row_to_show(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_shows(&self) -> Result<Vec<ShowRecord>> {
        let conn = self.db.get_connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {SHOW_COLUMNS} FROM shows ORDER BY show_id"),
                libsql::params![],
            )
            .await
            .map_err(|e| store_err("Failed to query shows", e))?;

        let mut shows = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| store_err("Failed to read row", e))?
        {
            shows.push(row_to_show(&row)?);
        }

        Ok(shows)
    }

    async fn mark_finished_before(&self, today: NaiveDate) -> Result<u64> {
        let conn = self.db.get_connection()?;

        conn.execute(
            "UPDATE shows SET state = 'FINISHED', updated_at = ? WHERE end_date < ?",
            libsql::params![Utc::now().to_rfc3339(), today.to_string()],
        )
        .await
        .map_err(|e| store_err("Failed to mark finished shows", e))
    }

    async fn mark_running_at(&self, today: NaiveDate) -> Result<u64> {
        let conn = self.db.get_connection()?;

        conn.execute(
            "UPDATE shows SET state = 'RUNNING', updated_at = ? \
             WHERE start_date <= ? AND end_date > ?",
            libsql::params![
                Utc::now().to_rfc3339(),
                today.to_string(),
                today.to_string()
            ],
        )
        .await
        .map_err(|e| store_err("Failed to mark running shows", e))
    }

    async fn set_rank(&self, show_id: &str, rank: i64) -> Result<u64> {
        let conn = self.db.get_connection()?;

        conn.execute(
            "UPDATE shows SET rank = ?, updated_at = ? WHERE show_id = ?",
            libsql::params![rank, Utc::now().to_rfc3339(), show_id],
        )
        .await
        .map_err(|e| store_err("Failed to set rank", e))
    }
}
