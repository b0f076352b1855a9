//! Common types used throughout dioxus-stats-dashboard

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{errors::FetchError, platform::format_relative_time};

/// The four counters shown on the dashboard.
///
/// Field names match the stats endpoint's JSON body and the persisted cache slot.
/// A snapshot is never mutated after construction; every fetch produces a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSnapshot {
    total_users: u64,
    total_providers: u64,
    total_active_providers: u64,
    total_queries_processed: u64,
}

impl MetricSnapshot {
    pub const fn new(
        total_users: u64,
        total_providers: u64,
        total_active_providers: u64,
        total_queries_processed: u64,
    ) -> Self {
        Self {
            total_users,
            total_providers,
            total_active_providers,
            total_queries_processed,
        }
    }

    pub fn total_users(&self) -> u64 {
        self.total_users
    }

    pub fn total_providers(&self) -> u64 {
        self.total_providers
    }

    pub fn total_active_providers(&self) -> u64 {
        self.total_active_providers
    }

    pub fn total_queries_processed(&self) -> u64 {
        self.total_queries_processed
    }

    /// Read one counter by kind
    pub fn get(&self, kind: MetricKind) -> u64 {
        match kind {
            MetricKind::Users => self.total_users,
            MetricKind::Providers => self.total_providers,
            MetricKind::ActiveProviders => self.total_active_providers,
            MetricKind::QueriesProcessed => self.total_queries_processed,
        }
    }

    /// Counters in card order
    pub fn values(&self) -> [u64; MetricKind::COUNT] {
        MetricKind::ALL.map(|kind| self.get(kind))
    }
}

/// Identifies one metric card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Users,
    Providers,
    ActiveProviders,
    QueriesProcessed,
}

impl MetricKind {
    pub const COUNT: usize = 4;

    /// All kinds in the order the cards are laid out
    pub const ALL: [MetricKind; Self::COUNT] = [
        MetricKind::Users,
        MetricKind::Providers,
        MetricKind::ActiveProviders,
        MetricKind::QueriesProcessed,
    ];

    /// Position of the card, also used to stagger its animation start
    pub fn index(self) -> usize {
        match self {
            MetricKind::Users => 0,
            MetricKind::Providers => 1,
            MetricKind::ActiveProviders => 2,
            MetricKind::QueriesProcessed => 3,
        }
    }

    /// Card title
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Users => "Total Users",
            MetricKind::Providers => "Total Providers",
            MetricKind::ActiveProviders => "Active Providers",
            MetricKind::QueriesProcessed => "Queries Processed",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Render a counter with thousands separators, e.g. `58210` as `58,210`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    formatted
}

/// A persisted snapshot paired with the wall-clock time it was captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub snapshot: MetricSnapshot,
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(snapshot: MetricSnapshot, captured_at: DateTime<Utc>) -> Self {
        Self {
            snapshot,
            captured_at,
        }
    }

    /// Age of the entry at `now`. Capture times in the future count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.captured_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Checks whether the entry is younger than `window` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }
}

/// Where a successful refresh got its snapshot from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Served from a fresh persisted entry, no network access
    Cache,
    /// Fetched from the stats endpoint and persisted
    Network,
}

/// Everything the presentation surface needs to render the dashboard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub snapshot: MetricSnapshot,
    pub loading: bool,
    pub error: Option<FetchError>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// True when the degraded-connectivity banner should be shown
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Relative "last updated" label, if anything was ever loaded
    pub fn last_updated_label(&self, now: DateTime<Utc>) -> Option<String> {
        self.last_updated
            .map(|timestamp| format_relative_time(timestamp, now))
    }
}
