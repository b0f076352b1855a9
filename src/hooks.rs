//! # Dashboard Hooks
//!
//! Binds a [`StatsDashboard`] to a Dioxus component: the dashboard is created and
//! activated on first render, mirrored into signals while the component lives, and
//! deactivated when the component is dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dioxus::prelude::*;
//! use dioxus_stats_dashboard::prelude::*;
//!
//! #[component]
//! fn StatsPage() -> Element {
//!     let dashboard = use_stats_dashboard(|| {
//!         StatsDashboard::from_config(
//!             &DashboardConfig::default(),
//!             MemoryStore::new(),
//!             SessionContext::with_token("token"),
//!         )
//!     });
//!     let state = dashboard.state();
//!
//!     rsx! {
//!         if let Some(error) = &state.error {
//!             div { class: "banner", "{error.banner_message()}" }
//!         }
//!         for kind in MetricKind::ALL {
//!             div { "{kind}: {dashboard.formatted(kind)}" }
//!         }
//!         button { onclick: move |_| dashboard.refresh(), "Refresh" }
//!     }
//! }
//! ```

use std::{rc::Rc, sync::Arc};

use dioxus::prelude::*;
use tracing::debug;

use crate::{
    fetcher::StatsFetcher,
    storage::KeyValueStore,
    types::{DashboardState, MetricKind, format_count},
    view::StatsDashboard,
};

/// What a component gets back from [`use_stats_dashboard`]
#[derive(Clone)]
pub struct DashboardHandle {
    state: Signal<DashboardState>,
    values: Signal<[u64; MetricKind::COUNT]>,
    refresh: Rc<dyn Fn()>,
}

impl DashboardHandle {
    /// Current render state (snapshot, loading flag, error, last update)
    pub fn state(&self) -> DashboardState {
        self.state.read().clone()
    }

    pub fn state_signal(&self) -> Signal<DashboardState> {
        self.state
    }

    /// Animated value of one card
    pub fn value(&self, kind: MetricKind) -> u64 {
        self.values.read()[kind.index()]
    }

    /// Animated value of one card with thousands separators
    pub fn formatted(&self, kind: MetricKind) -> String {
        format_count(self.value(kind))
    }

    /// Manual refresh trigger for a button
    pub fn refresh(&self) {
        (self.refresh)();
    }
}

/// Hook owning a [`StatsDashboard`] for the lifetime of the calling component.
///
/// `init` runs once, on first render. The dashboard is activated immediately and
/// deactivated when the component unmounts, which stops the refresh cycle, drops
/// in-flight results and cancels running animations.
pub fn use_stats_dashboard<F, S>(init: impl FnOnce() -> StatsDashboard<F, S>) -> DashboardHandle
where
    F: StatsFetcher,
    S: KeyValueStore,
{
    let dashboard = use_hook(|| {
        let dashboard = Arc::new(init());
        dashboard.activate();
        dashboard
    });
    let mut state = use_signal(|| dashboard.state());
    let mut values = use_signal(|| dashboard.displayed());

    // Mirror render state into the signal
    use_hook(|| {
        let mut updates = dashboard.subscribe();
        spawn(async move {
            while updates.changed().await.is_ok() {
                let next = updates.borrow_and_update().clone();
                state.set(next);
            }
        })
    });

    // Mirror each card's animated value
    use_hook(|| {
        for kind in MetricKind::ALL {
            let mut shown = dashboard.counters().get(kind).subscribe();
            spawn(async move {
                while shown.changed().await.is_ok() {
                    let value = *shown.borrow_and_update();
                    values.write()[kind.index()] = value;
                }
            });
        }
    });

    let dashboard_for_drop = dashboard.clone();
    use_drop(move || {
        debug!("🔄 [DASHBOARD] Component dropped, deactivating");
        dashboard_for_drop.deactivate();
    });

    let dashboard_for_refresh = dashboard.clone();
    DashboardHandle {
        state,
        values,
        refresh: Rc::new(move || dashboard_for_refresh.trigger_refresh()),
    }
}
