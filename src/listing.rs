use crate::error::{Result, SyncError};
use crate::regions::Region;
use crate::source::{normalize_list, SourceFetch, LISTING_ENDPOINT};
use crate::types::{DateWindow, ShowListingEntry};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct RegionLister {
    source: Arc<dyn SourceFetch>,
    genre_code: String,
}

impl RegionLister {
    pub fn new(source: Arc<dyn SourceFetch>, genre_code: String) -> Self {
        Self { source, genre_code }
    }

    /// Lists one page of shows across every region in parallel. A region
    /// whose query fails contributes nothing to the page; the others still
    /// count, so a single outage never empties a page.
    pub async fn list_page(
        &self,
        window: DateWindow,
        page: u32,
        rows: u32,
    ) -> Vec<ShowListingEntry> {
        let mut tasks = JoinSet::new();
        for region in Region::ALL {
            let source = Arc::clone(&self.source);
            let genre_code = self.genre_code.clone();
            tasks.spawn(async move {
                let listed = list_region(source, genre_code, region, window, page, rows).await;
                (region, listed)
            });
        }

        let mut entries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((region, Ok(mut listed))) => {
                    debug!("Region {} listed {} shows", region.name(), listed.len());
                    entries.append(&mut listed);
                }
                Ok((region, Err(e))) => {
                    warn!(
                        "Region {} listing failed, continuing without it: {}",
                        region.name(),
                        e
                    );
                }
                Err(e) => warn!("Region listing task panicked: {}", e),
            }
        }

        entries
    }
}

async fn list_region(
    source: Arc<dyn SourceFetch>,
    genre_code: String,
    region: Region,
    window: DateWindow,
    page: u32,
    rows: u32,
) -> Result<Vec<ShowListingEntry>> {
    let tree = source
        .fetch(
            LISTING_ENDPOINT,
            &[
                ("stdate", window.start.format("%Y%m%d").to_string()),
                ("eddate", window.end.format("%Y%m%d").to_string()),
                ("cpage", page.to_string()),
                ("rows", rows.to_string()),
                ("shcate", genre_code),
                ("signgucode", region.code().to_string()),
            ],
        )
        .await?;

    let mut entries = Vec::new();
    for item in normalize_list(&tree["dbs"]["db"]) {
        let show_id = item["mt20id"]
            .as_str()
            .ok_or_else(|| SyncError::MissingField("mt20id not found".into()))?;
        entries.push(ShowListingEntry {
            show_id: show_id.to_string(),
            venue_name: item["fcltynm"]
                .as_str()
                .unwrap_or_default()
                .trim()
                .to_string(),
            region_label: region.label().to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    /// Serves one listing stub per region; one chosen region fails outright.
    struct RegionStubs {
        failing_code: &'static str,
    }

    #[async_trait]
    impl SourceFetch for RegionStubs {
        async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
            let code = params
                .iter()
                .find(|(key, _)| *key == "signgucode")
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            if code == self.failing_code {
                return Err(SyncError::Status {
                    endpoint: endpoint.to_string(),
                    status: 500,
                });
            }
            Ok(json!({"dbs": {"db": {
                "mt20id": format!("PF{}", code),
                "fcltynm": "아트홀"
            }}}))
        }
    }

    fn window() -> DateWindow {
        DateWindow {
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 8, 31).unwrap(),
        }
    }

    #[tokio::test]
    async fn one_failing_region_does_not_empty_the_page() {
        let lister = RegionLister::new(
            Arc::new(RegionStubs { failing_code: "11" }),
            "GGGA".to_string(),
        );

        let entries = lister.list_page(window(), 1, 10).await;

        assert_eq!(entries.len(), Region::ALL.len() - 1);
        assert!(entries.iter().all(|e| e.show_id != "PF11"));
    }

    #[tokio::test]
    async fn entries_carry_the_merged_region_label() {
        let lister = RegionLister::new(
            Arc::new(RegionStubs { failing_code: "" }),
            "GGGA".to_string(),
        );

        let entries = lister.list_page(window(), 1, 10).await;

        let gyeonggi = entries.iter().find(|e| e.show_id == "PF41").unwrap();
        assert_eq!(gyeonggi.region_label, "경기/인천");
        let seoul = entries.iter().find(|e| e.show_id == "PF11").unwrap();
        assert_eq!(seoul.region_label, "서울");
    }
}
