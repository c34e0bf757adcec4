use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use stagesync::detail::ShowDetailFetcher;
use stagesync::error::{Result, SyncError};
use stagesync::geocoder::VenueGeocoder;
use stagesync::ingester::Ingester;
use stagesync::listing::RegionLister;
use stagesync::source::{SourceFetch, LISTING_ENDPOINT, VENUE_ENDPOINT};
use stagesync::storage::{InMemoryShowStore, ShowStore};
use stagesync::types::DateWindow;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned directory service. Listing pages are keyed by region code, detail
/// records by show id, venues by name; the venue id returned by the venue
/// search is simply the name itself.
#[derive(Default)]
struct FakeDirectory {
    listing_pages: Vec<HashMap<&'static str, Vec<Value>>>,
    details: HashMap<String, Value>,
    venues: HashMap<String, Value>,
    failing_regions: HashSet<&'static str>,
    listing_calls: Mutex<Vec<u32>>,
}

#[async_trait]
impl SourceFetch for FakeDirectory {
    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let param = |key: &str| {
            params
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
        };

        if endpoint == LISTING_ENDPOINT {
            let page: u32 = param("cpage").unwrap_or_default().parse().unwrap_or(1);
            let code = param("signgucode").unwrap_or_default();
            self.listing_calls.lock().unwrap().push(page);
            if self.failing_regions.contains(code.as_str()) {
                return Err(SyncError::Status {
                    endpoint: endpoint.to_string(),
                    status: 500,
                });
            }
            let items = self
                .listing_pages
                .get((page - 1) as usize)
                .and_then(|regions| regions.get(code.as_str()))
                .cloned()
                .unwrap_or_default();
            return Ok(json!({"dbs": {"db": items}}));
        }

        if let Some(show_id) = endpoint.strip_prefix("pblprfr/") {
            return match self.details.get(show_id) {
                Some(entry) => Ok(json!({"dbs": {"db": entry}})),
                None => Ok(json!({"dbs": {}})),
            };
        }

        if endpoint == VENUE_ENDPOINT {
            let name = param("shprfnmfct").unwrap_or_default();
            return if self.venues.contains_key(&name) {
                Ok(json!({"dbs": {"db": {"mt13id": name}}}))
            } else {
                Ok(json!({"dbs": {}}))
            };
        }

        if let Some(venue_id) = endpoint.strip_prefix("prfplc/") {
            return match self.venues.get(venue_id) {
                Some(entry) => Ok(json!({"dbs": {"db": entry}})),
                None => Ok(json!({"dbs": {}})),
            };
        }

        Ok(json!({}))
    }
}

fn stub(show_id: &str, venue: &str) -> Value {
    json!({"mt20id": show_id, "fcltynm": venue})
}

fn detail(show_id: &str, title: &str) -> Value {
    json!({
        "mt20id": show_id,
        "prfnm": title,
        "prfpdfrom": "2024.06.01",
        "prfpdto": "2024.08.31",
        "prfcast": "출연진 외",
        "prfruntime": "2시간",
        "prfage": "8세 이상",
        "pcseguidance": "전석 50,000원",
        "poster": "http://img.example.com/poster.jpg",
        "styurls": {"styurl": "http://img.example.com/sty1.jpg"}
    })
}

fn venue_point(la: &str, lo: &str) -> Value {
    json!({"la": la, "lo": lo, "seatscale": "800"})
}

fn window() -> DateWindow {
    DateWindow {
        start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    }
}

fn build_ingester(
    source: &Arc<FakeDirectory>,
    store: &Arc<InMemoryShowStore>,
    page_size: u32,
) -> Ingester {
    let source: Arc<dyn SourceFetch> = Arc::clone(source) as Arc<dyn SourceFetch>;
    let store: Arc<dyn ShowStore> = Arc::clone(store) as Arc<dyn ShowStore>;
    let lister = RegionLister::new(Arc::clone(&source), "GGGA".to_string());
    let geocoder = VenueGeocoder::new(Arc::clone(&source));
    let details = Arc::new(ShowDetailFetcher::new(source, geocoder));
    Ingester::new(
        lister,
        details,
        store,
        window(),
        page_size,
        Duration::from_millis(0),
    )
}

#[tokio::test]
async fn short_first_page_creates_all_new_shows_and_stops() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![HashMap::from([
            ("11", vec![stub("PF100", "샤롯데씨어터")]),
            ("41", vec![stub("PF200", "고양아람누리")]),
        ])],
        details: HashMap::from([
            ("PF100".to_string(), detail("PF100", "서울의 밤")),
            ("PF200".to_string(), detail("PF200", "경기의 낮")),
        ]),
        venues: HashMap::from([
            ("샤롯데씨어터".to_string(), venue_point("37.5112", "127.0980")),
            ("고양아람누리".to_string(), venue_point("37.6594", "126.7700")),
        ]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let summary = build_ingester(&source, &store, 10).run().await;

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 0);

    let seoul = store.get_show("PF100").await.unwrap().unwrap();
    assert_eq!(seoul.title, "서울의 밤");
    assert_eq!(seoul.region_label, "서울");
    assert_eq!(seoul.latitude, Some(37.5112));
    let gyeonggi = store.get_show("PF200").await.unwrap().unwrap();
    assert_eq!(gyeonggi.region_label, "경기/인천");

    // A short page means no second fetch.
    assert!(!source.listing_calls.lock().unwrap().contains(&2));
}

#[tokio::test]
async fn crawl_continues_while_pages_come_back_full() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![
            HashMap::from([(
                "11",
                vec![stub("PF001", "극장A"), stub("PF002", "극장A")],
            )]),
            HashMap::from([("11", vec![stub("PF003", "극장A")])]),
        ],
        details: HashMap::from([
            ("PF001".to_string(), detail("PF001", "공연 1")),
            ("PF002".to_string(), detail("PF002", "공연 2")),
            ("PF003".to_string(), detail("PF003", "공연 3")),
        ]),
        venues: HashMap::from([("극장A".to_string(), venue_point("37.0", "127.0"))]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let summary = build_ingester(&source, &store, 2).run().await;

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.created, 3);

    let calls = source.listing_calls.lock().unwrap();
    // Every page queries all seventeen regions, and the short second page
    // ends the crawl.
    assert_eq!(calls.iter().filter(|&&p| p == 1).count(), 17);
    assert_eq!(calls.iter().filter(|&&p| p == 2).count(), 17);
    assert!(!calls.contains(&3));
}

#[tokio::test]
async fn rerun_with_nothing_new_writes_nothing() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![HashMap::from([(
            "11",
            vec![stub("PF001", "극장A"), stub("PF002", "극장A")],
        )])],
        details: HashMap::from([
            ("PF001".to_string(), detail("PF001", "공연 1")),
            ("PF002".to_string(), detail("PF002", "공연 2")),
        ]),
        venues: HashMap::from([("극장A".to_string(), venue_point("37.0", "127.0"))]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let first = build_ingester(&source, &store, 10).run().await;
    assert_eq!(first.created, 2);

    let second = build_ingester(&source, &store, 10).run().await;
    assert_eq!(second.created, 0);
    assert_eq!(second.already_known, 2);
    assert_eq!(store.list_shows().await.unwrap().len(), 2);
}

#[tokio::test]
async fn failing_region_does_not_stop_the_others() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![HashMap::from([
            ("11", vec![stub("PF100", "극장A")]),
            ("26", vec![stub("PF260", "극장A")]),
        ])],
        details: HashMap::from([
            ("PF100".to_string(), detail("PF100", "서울 공연")),
            ("PF260".to_string(), detail("PF260", "부산 공연")),
        ]),
        venues: HashMap::from([("극장A".to_string(), venue_point("35.1", "129.0"))]),
        failing_regions: HashSet::from(["11"]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let summary = build_ingester(&source, &store, 10).run().await;

    assert_eq!(summary.created, 1);
    assert!(store.get_show("PF260").await.unwrap().is_some());
    assert!(store.get_show("PF100").await.unwrap().is_none());
}

#[tokio::test]
async fn geocode_failure_fails_only_that_entry_and_stores_nothing_partial() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![HashMap::from([(
            "11",
            vec![stub("PF001", "등록 안 된 극장"), stub("PF002", "극장A")],
        )])],
        details: HashMap::from([
            ("PF001".to_string(), detail("PF001", "좌초된 공연")),
            ("PF002".to_string(), detail("PF002", "무사한 공연")),
        ]),
        venues: HashMap::from([("극장A".to_string(), venue_point("37.0", "127.0"))]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let summary = build_ingester(&source, &store, 10).run().await;

    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);
    assert!(store.get_show("PF001").await.unwrap().is_none());
    assert!(store.get_show("PF002").await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_listing_across_regions_stores_one_record() {
    let source = Arc::new(FakeDirectory {
        listing_pages: vec![HashMap::from([
            ("41", vec![stub("PF777", "극장A")]),
            ("28", vec![stub("PF777", "극장A")]),
        ])],
        details: HashMap::from([("PF777".to_string(), detail("PF777", "두 번 올라온 공연"))]),
        venues: HashMap::from([("극장A".to_string(), venue_point("37.0", "127.0"))]),
        ..Default::default()
    });
    let store = Arc::new(InMemoryShowStore::new());

    let summary = build_ingester(&source, &store, 10).run().await;

    // Both entries race through the existence check; the store's key keeps
    // exactly one row however the race resolves.
    assert_eq!(summary.created, 1);
    assert_eq!(summary.already_known, 1);
    assert_eq!(store.list_shows().await.unwrap().len(), 1);
}
