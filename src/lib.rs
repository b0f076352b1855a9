#![doc = include_str!("../README.md")]

// Core modules
pub mod animation;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod platform;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod types;
pub mod view;

pub mod hooks;

pub mod prelude {
    //! The prelude exports all the most common types and functions for using dioxus-stats-dashboard.

    // The view object and the hook binding it to a component
    pub use crate::hooks::{DashboardHandle, use_stats_dashboard};
    pub use crate::view::StatsDashboard;

    // Cache management
    pub use crate::cache::{CacheManagerStats, Refreshed, StatsCacheManager};
    pub use crate::fetcher::{HttpStatsFetcher, StatsFetcher};
    pub use crate::session::SessionContext;
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};

    // Animation
    pub use crate::animation::{CountUp, MetricCounters};

    // Data and errors
    pub use crate::config::DashboardConfig;
    pub use crate::errors::{FetchError, RefreshFailure};
    pub use crate::types::{CacheEntry, DashboardState, MetricKind, MetricSnapshot, format_count};
}
