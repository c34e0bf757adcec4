use crate::source::{normalize_list, SourceFetch, BOXOFFICE_ENDPOINT};
use crate::storage::ShowStore;
use crate::types::RankEntry;
use chrono::{FixedOffset, NaiveDate, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// The source publishes its calendar in Korea Standard Time.
static KST: Lazy<FixedOffset> = Lazy::new(|| FixedOffset::east_opt(9 * 3600).unwrap());

/// Today according to the source's calendar, not the host's. A show ending
/// "yesterday" must flip to FINISHED at midnight KST, wherever this runs.
pub fn source_today() -> NaiveDate {
    Utc::now().with_timezone(&*KST).date_naive()
}

pub struct LifecycleJob {
    source: Arc<dyn SourceFetch>,
    store: Arc<dyn ShowStore>,
    genre_code: String,
}

impl LifecycleJob {
    pub fn new(
        source: Arc<dyn SourceFetch>,
        store: Arc<dyn ShowStore>,
        genre_code: String,
    ) -> Self {
        Self {
            source,
            store,
            genre_code,
        }
    }

    /// Runs the state advance and the weekly rank sync concurrently. Both
    /// halves log their own failures and never abort the other.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        let today = source_today();
        info!("🔄 Lifecycle sync for {}", today);
        counter!("stagesync_lifecycle_runs_total").increment(1);

        tokio::join!(self.advance_states(today), self.sync_ranks(today));

        info!("✅ Lifecycle sync finished");
    }

    /// Applies the two unconditional date-predicate updates. The predicates
    /// are disjoint (`end < today` vs `today < end`), so the two updates
    /// can run concurrently in either order.
    pub async fn advance_states(&self, today: NaiveDate) {
        let (finished, running) = tokio::join!(
            self.store.mark_finished_before(today),
            self.store.mark_running_at(today),
        );

        match finished {
            Ok(n) => info!("Marked {} shows FINISHED", n),
            Err(e) => error!("Failed to mark finished shows: {}", e),
        }
        match running {
            Ok(n) => info!("Marked {} shows RUNNING", n),
            Err(e) => error!("Failed to mark running shows: {}", e),
        }
    }

    /// Pulls the weekly ranking feed and applies each rank in parallel.
    /// Ranked shows the store never ingested are skipped without raising.
    pub async fn sync_ranks(&self, today: NaiveDate) {
        let tree = match self
            .source
            .fetch(
                BOXOFFICE_ENDPOINT,
                &[
                    ("ststype", "week".to_string()),
                    ("date", today.format("%Y%m%d").to_string()),
                    ("catecode", self.genre_code.clone()),
                ],
            )
            .await
        {
            Ok(tree) => tree,
            Err(e) => {
                error!("Ranking feed fetch failed, skipping rank sync: {}", e);
                return;
            }
        };

        let feed = parse_rank_feed(&tree);
        info!("Ranking feed carries {} entries", feed.len());

        let mut tasks = JoinSet::new();
        for RankEntry { show_id, rank } in feed {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                match store.set_rank(&show_id, rank).await {
                    Ok(0) => debug!("Rank {} points at unknown show {}", rank, show_id),
                    Ok(_) => debug!("Show {} now ranked {}", show_id, rank),
                    Err(e) => warn!("Rank update for {} failed: {}", show_id, e),
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Rank task panicked: {}", e);
            }
        }
    }
}

/// Extracts `(show_id, rank)` pairs from the feed, dropping malformed rows.
fn parse_rank_feed(tree: &Value) -> Vec<RankEntry> {
    normalize_list(&tree["boxofs"]["boxof"])
        .into_iter()
        .filter_map(|item| {
            let show_id = match item["mt20id"].as_str().map(str::trim) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    warn!("Ranking entry without a show id, dropped");
                    return None;
                }
            };
            match rank_number(&item["rnum"]) {
                Some(rank) => Some(RankEntry { show_id, rank }),
                None => {
                    warn!("Ranking entry for {} without a rank, dropped", show_id);
                    None
                }
            }
        })
        .collect()
}

/// Rank order arrives as a number or as numeric text depending on the feed.
fn rank_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
