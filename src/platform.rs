//! # Cross-Platform Abstractions
//!
//! This module provides unified abstractions for the clocks, timers and background
//! tasks used by the cache manager, the refresh cycle and the count-up animator,
//! so that none of them needs its own `cfg(target_family = "wasm")` branches.

use std::time::Duration;

// Cross-platform monotonic clock. Natively this is tokio's clock so that paused
// test runtimes drive animations deterministically.
#[cfg(not(target_family = "wasm"))]
pub use tokio::time::Instant;
#[cfg(target_family = "wasm")]
pub use web_time::Instant;

// Cross-platform sleep function
#[cfg(not(target_family = "wasm"))]
use tokio::time::sleep as tokio_sleep;
#[cfg(target_family = "wasm")]
use wasmtimer::tokio::sleep as wasm_sleep;

/// Cross-platform time utilities
pub mod time {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Current wall-clock time, used for persisted capture timestamps
    pub fn now_utc() -> DateTime<Utc> {
        Utc::now()
    }

    /// Current monotonic time, used for animation progress
    pub fn now_instant() -> Instant {
        Instant::now()
    }

    /// Sleep for the specified duration
    pub async fn sleep(duration: Duration) {
        #[cfg(not(target_family = "wasm"))]
        tokio_sleep(duration).await;
        #[cfg(target_family = "wasm")]
        wasm_sleep(duration).await;
    }

    /// Format a timestamp as relative time (e.g., "5s ago", "2m ago")
    pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let diff = (now - timestamp).num_seconds().max(0);

        if diff < 60 {
            format!("{diff}s ago")
        } else if diff < 3600 {
            format!("{}m ago", diff / 60)
        } else {
            format!("{}h ago", diff / 3600)
        }
    }
}

/// Thread-safety bounds that only apply where tasks can move between threads.
///
/// Natively these are `Send`/`Sync`. On the web every future runs on the single
/// browser thread and browser-backed futures (fetch, timers) are `!Send`, so the
/// bounds are empty there.
pub mod marker {
    #[cfg(not(target_family = "wasm"))]
    pub trait MaybeSend: Send {}
    #[cfg(not(target_family = "wasm"))]
    impl<T: Send + ?Sized> MaybeSend for T {}

    #[cfg(target_family = "wasm")]
    pub trait MaybeSend {}
    #[cfg(target_family = "wasm")]
    impl<T: ?Sized> MaybeSend for T {}

    #[cfg(not(target_family = "wasm"))]
    pub trait MaybeSync: Sync {}
    #[cfg(not(target_family = "wasm"))]
    impl<T: Sync + ?Sized> MaybeSync for T {}

    #[cfg(target_family = "wasm")]
    pub trait MaybeSync {}
    #[cfg(target_family = "wasm")]
    impl<T: ?Sized> MaybeSync for T {}
}

/// Cross-platform task management
pub mod task {
    use futures::future::{AbortHandle, Abortable};
    use std::future::Future;

    /// Handle to a spawned background task.
    ///
    /// Aborting is idempotent. Dropping the handle does not abort the task;
    /// owners that need cancel-on-drop call [`TaskHandle::abort`] from their
    /// own `Drop` impl.
    #[derive(Debug, Clone)]
    pub struct TaskHandle {
        name: &'static str,
        abort: AbortHandle,
    }

    impl TaskHandle {
        /// Stop the task at its next suspension point
        pub fn abort(&self) {
            if !self.abort.is_aborted() {
                tracing::debug!("Aborting task: {}", self.name);
                self.abort.abort();
            }
        }

        /// Returns true once [`TaskHandle::abort`] has been called
        pub fn is_aborted(&self) -> bool {
            self.abort.is_aborted()
        }

        pub fn name(&self) -> &'static str {
            self.name
        }
    }

    /// Spawn a named, abortable task that works on both web and desktop
    #[cfg(not(target_family = "wasm"))]
    pub fn spawn_named<F>(name: &'static str, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        tokio::spawn(Abortable::new(
            async move {
                tracing::debug!("Starting task: {}", name);
                future.await;
                tracing::debug!("Completed task: {}", name);
            },
            registration,
        ));
        TaskHandle { name, abort }
    }

    /// Spawn a named, abortable task that works on both web and desktop
    #[cfg(target_family = "wasm")]
    pub fn spawn_named<F>(name: &'static str, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        dioxus::prelude::spawn(async move {
            let _ = Abortable::new(
                async move {
                    tracing::debug!("Starting task: {}", name);
                    future.await;
                    tracing::debug!("Completed task: {}", name);
                },
                registration,
            )
            .await;
        });
        TaskHandle { name, abort }
    }
}

/// Cross-platform configuration defaults
pub mod config {
    use super::*;

    /// Stats endpoint used when nothing else is configured
    pub const DEFAULT_STATS_ENDPOINT: &str = "http://localhost:8000/api/analytics/stats";

    /// A cached snapshot younger than this is served without a network call
    pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(10 * 60);

    /// Period of the forced background refresh
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Length of one count-up transition
    pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(1500);

    /// Time between two published animation frames (~60 fps)
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

    /// Extra start delay applied per card position
    pub const DEFAULT_CARD_STAGGER: Duration = Duration::from_millis(100);

    /// Persistence slot holding the JSON-encoded snapshot
    pub const SNAPSHOT_KEY: &str = "dashboard_stats";

    /// Persistence slot holding the RFC 3339 capture timestamp
    pub const TIMESTAMP_KEY: &str = "dashboard_stats_timestamp";
}

pub use config::*;
pub use marker::{MaybeSend, MaybeSync};
/// Re-export commonly used platform functions
pub use time::{format_relative_time, now_instant, now_utc, sleep};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_format_relative_time() {
        let now = now_utc();
        assert_eq!(format_relative_time(now - TimeDelta::seconds(5), now), "5s ago");
        assert_eq!(format_relative_time(now - TimeDelta::minutes(2), now), "2m ago");
        assert_eq!(format_relative_time(now - TimeDelta::hours(3), now), "3h ago");
    }

    #[test]
    fn test_future_timestamp_reads_as_now() {
        let now = now_utc();
        assert_eq!(format_relative_time(now + TimeDelta::seconds(30), now), "0s ago");
    }

    #[tokio::test]
    async fn test_aborted_task_never_finishes() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = task::spawn_named("test-abort", async move {
            sleep(Duration::from_secs(3600)).await;
            let _ = tx.send(());
        });
        handle.abort();
        assert!(handle.is_aborted());
        // The sender is dropped with the aborted future.
        assert!(rx.await.is_err());
    }
}
