use crate::detail::ShowDetailFetcher;
use crate::listing::RegionLister;
use crate::storage::{InsertOutcome, ShowStore};
use crate::types::{DateWindow, ShowListingEntry};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Result of a complete ingestion run.
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    pub pages: u32,
    pub listed: usize,
    pub created: usize,
    pub already_known: usize,
    pub failed: usize,
}

/// What happened to a single listing entry.
enum EntryOutcome {
    Created,
    AlreadyKnown,
    Failed,
}

pub struct Ingester {
    lister: RegionLister,
    details: Arc<ShowDetailFetcher>,
    store: Arc<dyn ShowStore>,
    window: DateWindow,
    page_size: u32,
    page_delay: Duration,
}

impl Ingester {
    pub fn new(
        lister: RegionLister,
        details: Arc<ShowDetailFetcher>,
        store: Arc<dyn ShowStore>,
        window: DateWindow,
        page_size: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            lister,
            details,
            store,
            window,
            page_size,
            page_delay,
        }
    }

    /// Crawls listing pages until a short page signals the end, creating
    /// every show the store has not seen yet. Per-entry failures are
    /// absorbed into the summary; the run itself always completes.
    #[instrument(skip(self))]
    pub async fn run(&self) -> IngestSummary {
        info!(
            "🚀 Starting ingestion for {} to {}",
            self.window.start, self.window.end
        );
        counter!("stagesync_ingest_runs_total").increment(1);
        let t_run = std::time::Instant::now();

        let mut summary = IngestSummary::default();
        let mut page = 1u32;

        loop {
            let entries = self.lister.list_page(self.window, page, self.page_size).await;
            info!("📋 Page {} listed {} entries", page, entries.len());

            summary.pages = page;
            summary.listed += entries.len();
            // A full page implies more may follow; anything else is the end.
            let full_page = entries.len() == self.page_size as usize;

            self.ingest_page(entries, &mut summary).await;

            if !full_page {
                break;
            }
            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        histogram!("stagesync_ingest_duration_seconds").record(t_run.elapsed().as_secs_f64());
        counter!("stagesync_shows_created_total").increment(summary.created as u64);
        counter!("stagesync_shows_skipped_total").increment(summary.already_known as u64);
        counter!("stagesync_shows_failed_total").increment(summary.failed as u64);
        info!(
            "✅ Ingestion done: {} pages, {} listed, {} created, {} already known, {} failed",
            summary.pages, summary.listed, summary.created, summary.already_known, summary.failed
        );

        summary
    }

    async fn ingest_page(&self, entries: Vec<ShowListingEntry>, summary: &mut IngestSummary) {
        let mut tasks = JoinSet::new();
        for entry in entries {
            let store = Arc::clone(&self.store);
            let details = Arc::clone(&self.details);
            tasks.spawn(async move { ingest_entry(store, details, entry).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(EntryOutcome::Created) => summary.created += 1,
                Ok(EntryOutcome::AlreadyKnown) => summary.already_known += 1,
                Ok(EntryOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    warn!("Entry task panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }
    }
}

/// Check-then-fetch-then-insert for one listing stub. The existence check
/// and the insert are not atomic; the store's `show_id` key settles any
/// race and reports it back here as AlreadyExists.
async fn ingest_entry(
    store: Arc<dyn ShowStore>,
    details: Arc<ShowDetailFetcher>,
    entry: ShowListingEntry,
) -> EntryOutcome {
    match store.contains(&entry.show_id).await {
        Ok(true) => {
            debug!("Show {} already stored, skipping", entry.show_id);
            return EntryOutcome::AlreadyKnown;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Existence check for {} failed: {}", entry.show_id, e);
            return EntryOutcome::Failed;
        }
    }

    let record = match details
        .fetch(&entry.show_id, &entry.venue_name, &entry.region_label)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            warn!(
                "Detail fetch for {} failed, entry stays absent until a later run: {}",
                entry.show_id, e
            );
            return EntryOutcome::Failed;
        }
    };

    match store.insert_show(&record).await {
        Ok(InsertOutcome::Created) => {
            info!("Created show {} ({})", record.show_id, record.title);
            EntryOutcome::Created
        }
        Ok(InsertOutcome::AlreadyExists) => {
            debug!(
                "Show {} was inserted concurrently, keeping the first write",
                record.show_id
            );
            EntryOutcome::AlreadyKnown
        }
        Err(e) => {
            warn!("Insert for {} failed: {}", record.show_id, e);
            EntryOutcome::Failed
        }
    }
}
