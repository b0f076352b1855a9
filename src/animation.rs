//! # Count-Up Animation
//!
//! Each metric card shows a number that eases from its previous value to a newly
//! received target. A transition is a cancellable background task publishing one
//! value per frame; the interpolation itself is pure and lives in
//! [`interpolate`] / [`AnimationState::display_at`].
//!
//! ## State machine
//!
//! `Idle -> Animating -> Idle` for a normal transition, `Animating -> Animating`
//! when a new target preempts a running one, `Animating -> Cancelled` on teardown.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dioxus_stats_dashboard::animation::CountUp;
//! use std::time::Duration;
//!
//! # async fn demo() {
//! let counter = CountUp::new("users");
//! counter.start(0, 1000, Duration::from_millis(1500), Duration::ZERO);
//! let mut values = counter.subscribe();
//! while values.changed().await.is_ok() {
//!     println!("{}", *values.borrow());
//! }
//! # }
//! ```

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::watch;
use tracing::debug;

use crate::{
    platform::{
        DEFAULT_ANIMATION_DURATION, DEFAULT_CARD_STAGGER, DEFAULT_FRAME_INTERVAL, Instant,
        now_instant, sleep,
        task::{TaskHandle, spawn_named},
    },
    types::{MetricKind, MetricSnapshot},
};

/// Cubic ease-out: fast start, slow finish. `progress` is clamped to `[0, 1]`.
pub fn ease_out_cubic(progress: f64) -> f64 {
    let t = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Value shown at `progress` of a transition from `previous` to `target`.
///
/// Floors the eased value, so the result never leaves `[min, max]` of the two
/// endpoints, and snaps to `target` once `progress >= 1`.
pub fn interpolate(previous: u64, target: u64, progress: f64) -> u64 {
    if progress >= 1.0 {
        return target;
    }
    let eased = ease_out_cubic(progress);
    let start = previous as f64;
    let value = (start + (target as f64 - start) * eased).floor();
    let (low, high) = (previous.min(target), previous.max(target));
    (value as u64).clamp(low, high)
}

/// Lifecycle phase of one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    /// Settled on `target`
    Idle,
    /// Waiting out the start delay or publishing frames
    Animating,
    /// Stopped early by teardown; `current` keeps its last value
    Cancelled,
}

/// Per-metric transition state
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub previous: u64,
    pub target: u64,
    /// Set once the start delay has elapsed
    pub started_at: Option<Instant>,
    pub current: u64,
    pub phase: AnimationPhase,
    /// Interpolated frames published by the current transition
    pub frames: u32,
    generation: u64,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            previous: 0,
            target: 0,
            started_at: None,
            current: 0,
            phase: AnimationPhase::Idle,
            frames: 0,
            generation: 0,
        }
    }
}

impl AnimationState {
    pub fn is_running(&self) -> bool {
        self.phase == AnimationPhase::Animating
    }

    /// Value this transition shows `elapsed` after its start
    pub fn display_at(&self, elapsed: Duration, duration: Duration) -> u64 {
        interpolate(self.previous, self.target, progress(elapsed, duration))
    }

    fn settle(&mut self, target: u64) {
        self.previous = target;
        self.target = target;
        self.current = target;
        self.started_at = None;
        self.phase = AnimationPhase::Idle;
    }
}

fn progress(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        1.0
    } else {
        elapsed.as_secs_f64() / duration.as_secs_f64()
    }
}

/// One animated number.
///
/// Clones share the same counter. Starting a transition spawns a task, so it must
/// happen inside a runtime (a tokio runtime natively, a Dioxus scope on the web).
#[derive(Clone)]
pub struct CountUp {
    inner: Arc<CountUpInner>,
}

struct CountUpInner {
    name: &'static str,
    state: Mutex<AnimationState>,
    display: watch::Sender<u64>,
    task: Mutex<Option<TaskHandle>>,
    duration: Duration,
    frame_interval: Duration,
}

impl CountUp {
    /// Counter with the default 1500 ms duration and ~60 fps frames
    pub fn new(name: &'static str) -> Self {
        Self::with_timing(name, DEFAULT_ANIMATION_DURATION, DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_timing(name: &'static str, duration: Duration, frame_interval: Duration) -> Self {
        let (display, _) = watch::channel(0);
        Self {
            inner: Arc::new(CountUpInner {
                name,
                state: Mutex::new(AnimationState::default()),
                display,
                task: Mutex::new(None),
                duration,
                frame_interval,
            }),
        }
    }

    /// Currently displayed value
    pub fn value(&self) -> u64 {
        self.inner
            .state
            .lock()
            .map(|state| state.current)
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .state
            .lock()
            .map(|state| state.is_running())
            .unwrap_or(false)
    }

    /// Snapshot of the transition state
    pub fn state(&self) -> AnimationState {
        self.inner
            .state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Receiver notified every time the displayed value changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.display.subscribe()
    }

    /// Configured transition length
    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Animate from `previous` to `target` over `duration`, after waiting `delay`.
    ///
    /// Any running transition is cancelled first, without snapping it to its target.
    /// A target equal to `previous` or equal to zero is displayed immediately.
    pub fn start(&self, previous: u64, target: u64, duration: Duration, delay: Duration) {
        self.abort_task();

        let generation = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            state.generation += 1;
            state.frames = 0;
            if target == previous || target == 0 {
                state.settle(target);
                drop(state);
                self.inner.publish(target);
                debug!(
                    "⏭️ [COUNT-UP] {} set to {} without animation",
                    self.inner.name, target
                );
                return;
            }
            state.previous = previous;
            state.target = target;
            state.current = previous;
            state.started_at = None;
            state.phase = AnimationPhase::Animating;
            state.generation
        };
        self.inner.publish(previous);
        debug!(
            "🎬 [COUNT-UP] {} animating {} -> {} over {:?} (delay {:?})",
            self.inner.name, previous, target, duration, delay
        );

        let inner = self.inner.clone();
        let handle = spawn_named("count-up", async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            let started = now_instant();
            if !inner.mark_started(generation, started) {
                return;
            }
            loop {
                let elapsed = now_instant().saturating_duration_since(started);
                match inner.advance(generation, progress(elapsed, duration)) {
                    Some(false) => sleep(inner.frame_interval).await,
                    Some(true) | None => break,
                }
            }
        });

        if let Ok(mut task) = self.inner.task.lock() {
            *task = Some(handle);
        }
    }

    /// Animate from the currently displayed value to `target` with the configured duration.
    ///
    /// This is the preemption path: a transition still running is replaced by one
    /// starting wherever the display currently is. A transition already heading to
    /// `target` keeps running untouched.
    pub fn animate_to(&self, target: u64, delay: Duration) {
        let (current, already_heading) = match self.inner.state.lock() {
            Ok(state) => (state.current, state.is_running() && state.target == target),
            Err(_) => return,
        };
        if already_heading {
            debug!(
                "⏩ [COUNT-UP] {} already heading to {}",
                self.inner.name, target
            );
            return;
        }
        self.start(current, target, self.inner.duration, delay);
    }

    /// Stop the running transition, if any. The display keeps its last value.
    pub fn cancel(&self) {
        self.abort_task();
        if let Ok(mut state) = self.inner.state.lock() {
            state.generation += 1;
            if state.phase == AnimationPhase::Animating {
                state.phase = AnimationPhase::Cancelled;
                debug!(
                    "🛑 [COUNT-UP] {} cancelled at {} (target {})",
                    self.inner.name, state.current, state.target
                );
            }
        }
    }

    fn abort_task(&self) {
        if let Ok(mut task) = self.inner.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

impl CountUpInner {
    fn publish(&self, value: u64) {
        self.display.send_if_modified(|shown| {
            if *shown == value {
                false
            } else {
                *shown = value;
                true
            }
        });
    }

    /// Record the real start time. False when the transition was superseded.
    fn mark_started(&self, generation: u64, started: Instant) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.generation != generation {
            return false;
        }
        state.started_at = Some(started);
        true
    }

    /// Publish the frame for `progress`.
    ///
    /// Returns `Some(true)` once settled, `Some(false)` while running and `None` when
    /// the transition was superseded or cancelled.
    fn advance(&self, generation: u64, progress: f64) -> Option<bool> {
        let mut state = self.state.lock().ok()?;
        if state.generation != generation {
            return None;
        }

        if progress >= 1.0 {
            let target = state.target;
            state.settle(target);
            drop(state);
            self.publish(target);
            debug!("✅ [COUNT-UP] {} settled at {}", self.name, target);
            return Some(true);
        }

        let value = interpolate(state.previous, state.target, progress);
        state.current = value;
        state.frames += 1;
        drop(state);
        self.publish(value);
        Some(false)
    }
}

/// The four card counters of the dashboard
#[derive(Clone)]
pub struct MetricCounters {
    counters: [CountUp; MetricKind::COUNT],
    stagger: Duration,
}

impl Default for MetricCounters {
    fn default() -> Self {
        Self::new(
            DEFAULT_ANIMATION_DURATION,
            DEFAULT_FRAME_INTERVAL,
            DEFAULT_CARD_STAGGER,
        )
    }
}

impl MetricCounters {
    pub fn new(duration: Duration, frame_interval: Duration, stagger: Duration) -> Self {
        Self {
            counters: [
                CountUp::with_timing("users", duration, frame_interval),
                CountUp::with_timing("providers", duration, frame_interval),
                CountUp::with_timing("active_providers", duration, frame_interval),
                CountUp::with_timing("queries_processed", duration, frame_interval),
            ],
            stagger,
        }
    }

    pub fn get(&self, kind: MetricKind) -> &CountUp {
        &self.counters[kind.index()]
    }

    /// Start (or preempt) every card's transition toward `snapshot`.
    /// Card `i` waits `i * stagger` before moving.
    pub fn animate_to(&self, snapshot: &MetricSnapshot) {
        for kind in MetricKind::ALL {
            let delay = self.stagger * kind.index() as u32;
            self.get(kind).animate_to(snapshot.get(kind), delay);
        }
    }

    pub fn cancel_all(&self) {
        for counter in &self.counters {
            counter.cancel();
        }
    }

    /// Displayed values in card order
    pub fn values(&self) -> [u64; MetricKind::COUNT] {
        MetricKind::ALL.map(|kind| self.get(kind).value())
    }

    pub fn is_animating(&self) -> bool {
        self.counters.iter().any(CountUp::is_running)
    }
}
