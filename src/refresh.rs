//! # Refresh Cycle
//!
//! The recurring forced refresh of the dashboard. A cycle is a background task that
//! sleeps for its period and then runs its tick, forever, until stopped.
//!
//! ## Cross-Platform Compatibility
//!
//! Tasks are spawned through [`crate::platform::task`]:
//! - `tokio` tasks natively, `dioxus::spawn` on the web
//! - `wasmtimer` for web timing and `tokio` for desktop timing
//! - Stopping aborts the task at its next suspension point

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::debug;

use crate::platform::{
    MaybeSend, MaybeSync, sleep,
    task::{TaskHandle, spawn_named},
};

/// A running recurrence. Dropping it stops the task.
#[derive(Debug)]
pub struct RefreshCycle {
    period: Duration,
    handle: TaskHandle,
    ticks: Arc<AtomicU64>,
}

impl RefreshCycle {
    /// Start a cycle running `tick` every `period`.
    ///
    /// The first tick happens one full period after starting; whoever starts the
    /// cycle is expected to have loaded data already.
    pub fn start<F, Fut>(period: Duration, tick: F) -> Self
    where
        F: Fn() -> Fut + MaybeSend + MaybeSync + 'static,
        Fut: Future<Output = ()> + MaybeSend + 'static,
    {
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_for_task = ticks.clone();

        let handle = spawn_named("refresh-cycle", async move {
            loop {
                sleep(period).await;
                let count = ticks_for_task.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("🔁 [REFRESH] Tick #{} after {:?}", count, period);
                tick().await;
            }
        });

        debug!("▶️ [REFRESH] Started cycle every {:?}", period);
        Self {
            period,
            handle,
            ticks,
        }
    }

    /// Stop the cycle. A tick already running is abandoned at its next await.
    pub fn stop(&self) {
        if !self.handle.is_aborted() {
            debug!("⏹️ [REFRESH] Stopped cycle every {:?}", self.period);
            self.handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_aborted()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks started so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Drop for RefreshCycle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(300);

    fn counting_cycle() -> (RefreshCycle, Arc<AtomicU64>) {
        let calls = Arc::new(AtomicU64::new(0));
        let calls_for_tick = calls.clone();
        let cycle = RefreshCycle::start(PERIOD, move || {
            let calls = calls_for_tick.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        (cycle, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (cycle, calls) = counting_cycle();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(PERIOD * 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cycle.ticks(), 3);
        assert!(cycle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let (cycle, calls) = counting_cycle();
        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cycle.stop();
        assert!(!cycle.is_running());
        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_cycle() {
        let (cycle, calls) = counting_cycle();
        drop(cycle);
        tokio::time::sleep(PERIOD * 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
