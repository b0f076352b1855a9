//! # Dashboard View Lifecycle
//!
//! [`StatsDashboard`] is the object a host UI activates when the statistics page
//! mounts and deactivates when it unmounts. It owns every timer and in-flight
//! request guard the page needs:
//!
//! - the initial, cache-friendly load,
//! - the recurring forced refresh,
//! - the four count-up counters.
//!
//! State for rendering is published through a `tokio::sync::watch` channel so any
//! number of listeners (a Dioxus hook, a terminal renderer, a test) can follow it.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    animation::MetricCounters,
    cache::{Refreshed, StatsCacheManager},
    config::DashboardConfig,
    errors::RefreshFailure,
    fetcher::{HttpStatsFetcher, StatsFetcher},
    platform::task::{TaskHandle, spawn_named},
    refresh::RefreshCycle,
    session::SessionContext,
    storage::KeyValueStore,
    types::{DashboardState, MetricKind},
};

/// The statistics page: cache manager, refresh cycle and animated counters
pub struct StatsDashboard<F, S> {
    inner: Arc<DashboardInner<F, S>>,
    cycle: Mutex<Option<RefreshCycle>>,
    initial_load: Mutex<Option<TaskHandle>>,
}

struct DashboardInner<F, S> {
    manager: StatsCacheManager<F, S>,
    counters: MetricCounters,
    state: watch::Sender<DashboardState>,
    active: AtomicBool,
    /// Bumped on every activation so results from an earlier mount are ignored
    epoch: AtomicU64,
    /// Refreshes started and not yet finished, queued ones included
    outstanding: AtomicUsize,
    refresh_interval: Duration,
}

impl<S: KeyValueStore> StatsDashboard<HttpStatsFetcher, S> {
    /// Build a dashboard talking to the endpoint in `config`
    pub fn from_config(config: &DashboardConfig, store: S, session: SessionContext) -> Self {
        let fetcher = HttpStatsFetcher::from_config(config);
        let manager = StatsCacheManager::new(fetcher, store, session)
            .with_freshness_window(config.freshness_window);
        Self::with_manager(manager, config)
    }
}

impl<F, S> StatsDashboard<F, S>
where
    F: StatsFetcher,
    S: KeyValueStore,
{
    /// Build a dashboard around an existing manager, taking timings from `config`
    pub fn with_manager(manager: StatsCacheManager<F, S>, config: &DashboardConfig) -> Self {
        let counters = MetricCounters::new(
            config.animation_duration,
            config.frame_interval,
            config.card_stagger,
        );
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            inner: Arc::new(DashboardInner {
                manager,
                counters,
                state,
                active: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                outstanding: AtomicUsize::new(0),
                refresh_interval: config.refresh_interval,
            }),
            cycle: Mutex::new(None),
            initial_load: Mutex::new(None),
        }
    }

    /// Mount the view.
    ///
    /// Loads the cached snapshot (fetching only when it is stale or missing) and
    /// starts the forced refresh cycle. Calling it on an active view does nothing.
    pub fn activate(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        debug!(
            "🟢 [DASHBOARD] Activated, refreshing every {:?}",
            self.inner.refresh_interval
        );

        let inner = self.inner.clone();
        let initial = spawn_named("dashboard-initial-load", async move {
            inner.run_refresh(false).await;
        });
        if let Ok(mut slot) = self.initial_load.lock() {
            *slot = Some(initial);
        }

        let inner = self.inner.clone();
        let cycle = RefreshCycle::start(self.inner.refresh_interval, move || {
            let inner = inner.clone();
            async move { inner.run_refresh(true).await }
        });
        if let Ok(mut slot) = self.cycle.lock() {
            *slot = Some(cycle);
        }
    }

    /// Unmount the view: stop timers, drop in-flight results, cancel animations.
    /// Calling it on an inactive view does nothing.
    pub fn deactivate(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut slot) = self.cycle.lock() {
            if let Some(cycle) = slot.take() {
                cycle.stop();
            }
        }
        if let Ok(mut slot) = self.initial_load.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        self.inner.counters.cancel_all();
        self.inner.state.send_modify(|state| state.loading = false);
        debug!("🔴 [DASHBOARD] Deactivated");
    }

    /// Manual refresh: always contacts the network.
    ///
    /// Ignored on an inactive view. Waits for any refresh already in flight first.
    pub async fn refresh_now(&self) {
        self.inner.run_refresh(true).await;
    }

    /// Fire-and-forget [`StatsDashboard::refresh_now`] for UI callbacks
    pub fn trigger_refresh(&self) {
        if !self.is_active() {
            return;
        }
        let inner = self.inner.clone();
        spawn_named("dashboard-manual-refresh", async move {
            inner.run_refresh(true).await;
        });
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Current render state
    pub fn state(&self) -> DashboardState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every render state change
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.state.subscribe()
    }

    /// Animated values in card order
    pub fn displayed(&self) -> [u64; MetricKind::COUNT] {
        self.inner.counters.values()
    }

    pub fn counters(&self) -> &MetricCounters {
        &self.inner.counters
    }

    pub fn manager(&self) -> &StatsCacheManager<F, S> {
        &self.inner.manager
    }
}

impl<F, S> Drop for StatsDashboard<F, S> {
    fn drop(&mut self) {
        // Teardown without an explicit deactivate still stops every task.
        self.inner.active.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.initial_load.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        self.inner.counters.cancel_all();
    }
}

impl<F, S> DashboardInner<F, S>
where
    F: StatsFetcher,
    S: KeyValueStore,
{
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn run_refresh(&self, force_network: bool) {
        if !self.is_active() {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        let in_flight = InFlight::enter(self);
        let result = self.manager.refresh(force_network).await;
        let still_loading = in_flight.finish();

        // The view may have been torn down (or remounted) while the request was outstanding.
        if !self.is_active() {
            debug!("🗑️ [DASHBOARD] Dropping refresh result for inactive view");
            return;
        }
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("🗑️ [DASHBOARD] Dropping refresh result from an earlier activation");
            self.state.send_modify(|state| state.loading = still_loading);
            return;
        }
        match result {
            Ok(refreshed) => self.apply_success(refreshed, still_loading),
            Err(failure) => self.apply_failure(failure, still_loading),
        }
    }

    fn apply_success(&self, refreshed: Refreshed, still_loading: bool) {
        debug!(
            "✅ [DASHBOARD] Showing snapshot from {:?} captured at {}",
            refreshed.source, refreshed.captured_at
        );
        self.state.send_modify(|state| {
            state.snapshot = refreshed.snapshot;
            state.loading = still_loading;
            state.error = None;
            state.last_updated = Some(refreshed.captured_at);
        });
        self.counters.animate_to(&refreshed.snapshot);
    }

    fn apply_failure(&self, failure: RefreshFailure, still_loading: bool) {
        warn!("⚠️ [DASHBOARD] Showing degraded data: {}", failure.error);
        let fallback = failure.fallback;
        self.state.send_modify(|state| {
            if let Some(entry) = &fallback {
                state.snapshot = entry.snapshot;
                state.last_updated = Some(entry.captured_at);
            }
            state.loading = still_loading;
            state.error = Some(failure.error);
        });
        // Counters already heading to this snapshot keep their running transition.
        let snapshot = self.state.borrow().snapshot;
        self.counters.animate_to(&snapshot);
    }
}

/// Marks one refresh as outstanding until it finishes or its task is aborted.
struct InFlight<'a, F, S> {
    inner: &'a DashboardInner<F, S>,
    finished: bool,
}

impl<'a, F, S> InFlight<'a, F, S> {
    fn enter(inner: &'a DashboardInner<F, S>) -> Self {
        inner.outstanding.fetch_add(1, Ordering::SeqCst);
        inner.state.send_modify(|state| state.loading = true);
        Self {
            inner,
            finished: false,
        }
    }

    /// Leave the outstanding set. Returns true when other refreshes remain.
    fn finish(mut self) -> bool {
        self.finished = true;
        self.inner.outstanding.fetch_sub(1, Ordering::SeqCst) > 1
    }
}

impl<F, S> Drop for InFlight<'_, F, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let still_loading = self.inner.outstanding.fetch_sub(1, Ordering::SeqCst) > 1;
        if self.inner.active.load(Ordering::SeqCst) {
            self.inner
                .state
                .send_modify(|state| state.loading = still_loading);
        }
    }
}
