// End-to-end behaviour of the statistics page: cache decisions, degraded mode,
// manual refresh and persistence across page loads.

use chrono::TimeDelta;
use dioxus_stats_dashboard::platform::now_utc;
use dioxus_stats_dashboard::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fetcher replaying queued responses; an empty queue behaves like an unreachable server
#[derive(Clone, Default)]
struct QueuedFetcher {
    responses: Arc<Mutex<VecDeque<Result<MetricSnapshot, FetchError>>>>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl QueuedFetcher {
    fn push(&self, response: Result<MetricSnapshot, FetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

impl StatsFetcher for QueuedFetcher {
    async fn fetch(&self, token: Option<String>) -> Result<MetricSnapshot, FetchError> {
        self.tokens.lock().unwrap().push(token);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("connection refused".to_string())))
    }
}

fn server_error() -> FetchError {
    FetchError::HttpStatus {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn dashboard<S: KeyValueStore>(
    fetcher: &QueuedFetcher,
    store: S,
) -> StatsDashboard<QueuedFetcher, S> {
    let manager = StatsCacheManager::new(
        fetcher.clone(),
        store,
        SessionContext::with_token("session-token"),
    );
    StatsDashboard::with_manager(manager, &DashboardConfig::default())
}

fn seed<S: KeyValueStore>(store: S, snapshot: MetricSnapshot, age: TimeDelta) {
    StatsCacheManager::new(QueuedFetcher::default(), store, SessionContext::new())
        .persist(&CacheEntry::new(snapshot, now_utc() - age))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fresh_cache_is_shown_without_fetching() {
    init_tracing();
    let cached = MetricSnapshot::new(1200, 34, 29, 58210);
    let store = MemoryStore::new();
    seed(store.clone(), cached, TimeDelta::minutes(2));

    let fetcher = QueuedFetcher::default();
    let dashboard = dashboard(&fetcher, store);
    dashboard.activate();

    // Animation plus the widest card stagger
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(fetcher.calls(), 0);
    let state = dashboard.state();
    assert_eq!(state.snapshot, cached);
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(dashboard.displayed(), [1200, 34, 29, 58210]);
    assert_eq!(dashboard.manager().stats().cache_hits, 1);

    dashboard.deactivate();
}

#[tokio::test(start_paused = true)]
async fn test_server_error_then_manual_refresh_recovers() {
    init_tracing();
    let fetcher = QueuedFetcher::default();
    fetcher.push(Err(server_error()));
    let dashboard = dashboard(&fetcher, MemoryStore::new());
    dashboard.activate();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let state = dashboard.state();
    assert_eq!(state.error, Some(server_error()));
    assert_eq!(state.snapshot, MetricSnapshot::default());
    assert!(state.last_updated.is_none());
    assert_eq!(dashboard.displayed(), [0, 0, 0, 0]);

    fetcher.push(Ok(MetricSnapshot::new(1000, 40, 20, 8000)));
    dashboard.refresh_now().await;
    assert!(dashboard.state().error.is_none());
    assert!(dashboard.state().last_updated.is_some());

    // The first card has no stagger and is mid-flight halfway through the animation
    tokio::time::sleep(Duration::from_millis(750)).await;
    let users = dashboard.counters().get(MetricKind::Users).value();
    assert!(users > 0 && users < 1000, "users mid-animation: {users}");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(dashboard.displayed(), [1000, 40, 20, 8000]);
    assert_eq!(
        fetcher.tokens(),
        vec![
            Some("session-token".to_string()),
            Some("session-token".to_string())
        ]
    );

    dashboard.deactivate();
}

#[tokio::test(start_paused = true)]
async fn test_failure_with_stale_cache_shows_fallback_and_banner() {
    init_tracing();
    let stale = MetricSnapshot::new(500, 10, 5, 2000);
    let store = MemoryStore::new();
    seed(store.clone(), stale, TimeDelta::hours(3));

    let fetcher = QueuedFetcher::default();
    fetcher.push(Err(server_error()));
    let dashboard = dashboard(&fetcher, store);
    dashboard.activate();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 1);
    let state = dashboard.state();
    assert_eq!(state.snapshot, stale);
    assert!(state.has_error());
    assert_eq!(dashboard.displayed(), [500, 10, 5, 2000]);
    assert_eq!(dashboard.manager().stats().fallbacks_served, 1);

    dashboard.deactivate();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_cycle_forces_network_despite_fresh_cache() {
    init_tracing();
    let store = MemoryStore::new();
    seed(
        store.clone(),
        MetricSnapshot::new(1, 1, 1, 1),
        TimeDelta::seconds(5),
    );

    let fetcher = QueuedFetcher::default();
    fetcher.push(Ok(MetricSnapshot::new(2, 2, 2, 2)));
    let dashboard = dashboard(&fetcher, store);
    dashboard.activate();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 0);

    // First tick lands at the refresh interval
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(dashboard.displayed(), [2, 2, 2, 2]);
    assert_eq!(dashboard.manager().stats().network_fetches, 1);

    dashboard.deactivate();
}

#[tokio::test(start_paused = true)]
async fn test_file_store_carries_snapshot_to_next_page_load() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats-cache.json");

    let fetcher = QueuedFetcher::default();
    fetcher.push(Ok(MetricSnapshot::new(1200, 34, 29, 58210)));
    let first = dashboard(&fetcher, FileStore::new(&path));
    first.activate();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 1);
    first.deactivate();
    drop(first);

    // A second page load within the freshness window does not fetch again
    let second = dashboard(&fetcher, FileStore::new(&path));
    second.activate();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(second.displayed(), [1200, 34, 29, 58210]);
    assert!(second.state().error.is_none());

    second.deactivate();
}
