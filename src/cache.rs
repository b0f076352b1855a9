//! # Stats Cache Management
//!
//! This module implements the stale-while-revalidate cache behind the dashboard:
//! - **Freshness**: a persisted snapshot younger than the freshness window is served
//!   without touching the network.
//! - **Persistence**: every successful fetch overwrites the snapshot and timestamp slots.
//! - **Fallback**: a failed fetch hands back the last persisted snapshot, however old.
//! - **Single flight**: refreshes on one manager never overlap.
//! - **Stats**: hit/fetch/failure counters for introspection.
//!
//! ## Example
//! ```rust,no_run
//! use dioxus_stats_dashboard::prelude::*;
//!
//! # async fn demo() {
//! let manager = StatsCacheManager::new(
//!     HttpStatsFetcher::new("https://example.com/api/analytics/stats"),
//!     MemoryStore::new(),
//!     SessionContext::with_token("token"),
//! );
//! match manager.refresh(false).await {
//!     Ok(refreshed) => println!("users: {}", refreshed.snapshot.total_users()),
//!     Err(failure) => println!("degraded: {} (fallback: {:?})", failure.error, failure.fallback),
//! }
//! # }
//! ```

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    errors::{CacheReadError, RefreshFailure, StoreError},
    fetcher::StatsFetcher,
    platform::{DEFAULT_FRESHNESS_WINDOW, SNAPSHOT_KEY, TIMESTAMP_KEY, now_utc},
    session::SessionContext,
    storage::KeyValueStore,
    types::{CacheEntry, MetricSnapshot, SnapshotSource},
};

/// A successful refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refreshed {
    pub snapshot: MetricSnapshot,
    /// Capture time of the snapshot (cache timestamp or fetch time)
    pub captured_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

/// Checks if `entry` is younger than the default freshness window at `now`.
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    entry.is_fresh(now, DEFAULT_FRESHNESS_WINDOW)
}

/// Owns the persisted snapshot and decides between cache and network
pub struct StatsCacheManager<F, S> {
    fetcher: F,
    store: S,
    session: SessionContext,
    freshness_window: Duration,
    /// Held for the whole of a refresh so that refreshes are serialized
    in_flight: Mutex<()>,
    counters: ManagerCounters,
}

#[derive(Default)]
struct ManagerCounters {
    cache_hits: AtomicU64,
    network_fetches: AtomicU64,
    failures: AtomicU64,
    fallbacks_served: AtomicU64,
}

impl<F, S> StatsCacheManager<F, S>
where
    F: StatsFetcher,
    S: KeyValueStore,
{
    /// Creates a manager with the default 10 minute freshness window.
    pub fn new(fetcher: F, store: S, session: SessionContext) -> Self {
        Self {
            fetcher,
            store,
            session,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            in_flight: Mutex::new(()),
            counters: ManagerCounters::default(),
        }
    }

    /// Overrides the freshness window.
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the persisted entry.
    ///
    /// # Returns
    ///
    /// `None` when nothing was persisted yet, the store cannot be read, or either
    /// slot fails to parse. Never fails.
    pub fn load_cached(&self) -> Option<CacheEntry> {
        match self.try_load_cached() {
            Ok(entry) => Some(entry),
            Err(CacheReadError::Missing(slot)) => {
                debug!("📭 [STATS-CACHE] No cached entry in slot '{}'", slot);
                None
            }
            Err(error) => {
                debug!("🧹 [STATS-CACHE] Ignoring unusable cache: {}", error);
                None
            }
        }
    }

    fn try_load_cached(&self) -> Result<CacheEntry, CacheReadError> {
        let snapshot_json = self
            .store
            .get(SNAPSHOT_KEY)?
            .ok_or(CacheReadError::Missing(SNAPSHOT_KEY))?;
        let timestamp = self
            .store
            .get(TIMESTAMP_KEY)?
            .ok_or(CacheReadError::Missing(TIMESTAMP_KEY))?;

        let snapshot: MetricSnapshot =
            serde_json::from_str(&snapshot_json).map_err(|e| CacheReadError::Corrupt {
                slot: SNAPSHOT_KEY,
                reason: e.to_string(),
            })?;
        let captured_at = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| CacheReadError::Corrupt {
                slot: TIMESTAMP_KEY,
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);

        Ok(CacheEntry::new(snapshot, captured_at))
    }

    /// Checks if `entry` is younger than this manager's freshness window at `now`.
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.is_fresh(now, self.freshness_window)
    }

    /// Overwrites both slots with `entry`.
    ///
    /// The snapshot slot is written before the timestamp slot. If the second write
    /// fails the stored pair is a new snapshot under the previous, older timestamp,
    /// which can only make the entry look staler than it is and trigger an extra
    /// fetch. The reverse order could pass an old snapshot off as fresh.
    pub fn persist(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let snapshot_json = serde_json::to_string(&entry.snapshot)?;
        let timestamp = entry
            .captured_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        self.store.set(SNAPSHOT_KEY, &snapshot_json)?;
        self.store.set(TIMESTAMP_KEY, &timestamp)?;
        debug!("📊 [STATS-CACHE] Stored snapshot captured at {}", timestamp);
        Ok(())
    }

    /// Returns a snapshot, from cache when fresh and not forced, from the network otherwise.
    ///
    /// # Arguments
    ///
    /// * `force_network` - Skip the freshness check and always fetch.
    ///
    /// # Returns
    ///
    /// On fetch failure a [`RefreshFailure`] carrying the error and the last persisted
    /// entry regardless of its age. The persisted entry is left untouched.
    ///
    /// # Side Effects
    ///
    /// At most one outbound request. Overwrites the persisted entry on success.
    /// Concurrent calls wait for the one in flight before starting.
    pub async fn refresh(&self, force_network: bool) -> Result<Refreshed, RefreshFailure> {
        let _flight = self.in_flight.lock().await;

        if !force_network {
            if let Some(entry) = self.load_cached() {
                if self.is_fresh(&entry, now_utc()) {
                    self.counters.cache_hits.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        "⚡ [STATS-CACHE] Serving fresh snapshot captured at {}",
                        entry.captured_at
                    );
                    return Ok(Refreshed {
                        snapshot: entry.snapshot,
                        captured_at: entry.captured_at,
                        source: SnapshotSource::Cache,
                    });
                }
                debug!(
                    "⏰ [STATS-CACHE] Cached snapshot from {} is stale, fetching",
                    entry.captured_at
                );
            }
        }

        self.counters.network_fetches.fetch_add(1, Ordering::SeqCst);
        match self.fetcher.fetch(self.session.token()).await {
            Ok(snapshot) => {
                let entry = CacheEntry::new(snapshot, now_utc());
                if let Err(error) = self.persist(&entry) {
                    warn!("⚠️ [STATS-CACHE] Failed to persist snapshot: {}", error);
                }
                Ok(Refreshed {
                    snapshot,
                    captured_at: entry.captured_at,
                    source: SnapshotSource::Network,
                })
            }
            Err(error) => {
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                let fallback = self.load_cached();
                if fallback.is_some() {
                    self.counters.fallbacks_served.fetch_add(1, Ordering::SeqCst);
                }
                warn!(
                    "⚠️ [STATS-CACHE] Fetch failed: {} (cached fallback: {})",
                    error,
                    fallback.is_some()
                );
                Err(RefreshFailure { error, fallback })
            }
        }
    }

    /// Gets manager statistics.
    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            cache_hits: self.counters.cache_hits.load(Ordering::SeqCst),
            network_fetches: self.counters.network_fetches.load(Ordering::SeqCst),
            failures: self.counters.failures.load(Ordering::SeqCst),
            fallbacks_served: self.counters.fallbacks_served.load(Ordering::SeqCst),
        }
    }
}

/// Counters describing how refreshes were served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheManagerStats {
    pub cache_hits: u64,
    pub network_fetches: u64,
    pub failures: u64,
    pub fallbacks_served: u64,
}

impl CacheManagerStats {
    pub fn total_refreshes(&self) -> u64 {
        self.cache_hits + self.network_fetches
    }

    /// Share of refreshes served without a network call
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_refreshes();
        if total > 0 {
            self.cache_hits as f64 / total as f64
        } else {
            0.0
        }
    }
}
