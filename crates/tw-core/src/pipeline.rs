//! The pipeline facade: sketch, metrics, time mode, and the pause gate.
//!
//! This is the surface the ingest drivers, the time driver, the refresher,
//! and the UI all talk to. The sketch sits behind one mutex; every method
//! here takes it for a single bounded operation and never holds it across
//! I/O or sleeps. Bucket state is never leaked to callers - reads come back
//! as owned vectors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::info;
use tw_sketch::{SketchParams, SlidingTopK, TopItem};

use crate::config::Config;
use crate::metrics::LatencyMetrics;

/// Cooperative pause point shared by the ingest and tick threads. Reached
/// only through the pipeline's `toggle_pause`/`is_paused`/`wait_if_paused`.
#[derive(Debug, Default)]
struct PauseGate {
    paused: Mutex<bool>,
    signal: Condvar,
}

impl PauseGate {
    fn new() -> Self {
        Self::default()
    }

    /// Flip the gate; returns the new state.
    fn toggle(&self) -> bool {
        let mut paused = self.paused.lock();
        *paused = !*paused;
        let now_paused = *paused;
        drop(paused);
        self.signal.notify_all();
        now_paused
    }

    fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block while paused. Safe point only - never call with locks held.
    fn wait_if_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.signal.wait(&mut paused);
        }
    }
}

/// Process-wide ingest-and-rank state.
pub struct Pipeline {
    sketch: Mutex<SlidingTopK>,
    metrics: LatencyMetrics,
    /// Set once the first event timestamp is parsed; wall ticks become
    /// no-ops from then on.
    data_clock: AtomicBool,
    pause: PauseGate,
    history_len: usize,
    tick: Duration,
    window: Duration,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        let params = SketchParams {
            k: config.k,
            width: config.width,
            depth: config.depth,
            decay: config.decay,
            decay_lut_size: config.decay_lut_size,
            history_len: config.history_len(),
        };
        let metrics = LatencyMetrics::new(config.stats_window);
        metrics.set_enabled(config.stats_enabled);
        Self {
            sketch: Mutex::new(SlidingTopK::new(params, config.tick)),
            metrics,
            data_clock: AtomicBool::new(false),
            pause: PauseGate::new(),
            history_len: config.history_len(),
            tick: config.tick,
            window: config.window,
        }
    }

    /// Add one occurrence of `item`.
    pub fn ingest(&self, item: &str, now: DateTime<Utc>) {
        self.sketch.lock().incr(item);
        self.metrics.observe_ingest(now);
    }

    /// Add `count` occurrences of `item`.
    pub fn ingest_with_count(&self, item: &str, count: u32, now: DateTime<Utc>) {
        self.sketch.lock().add(item, count);
        self.metrics.observe_ingest(now);
    }

    /// Advance sketch time to `t` (wall or event time, per the active mode).
    /// Returns the number of ticks applied.
    pub fn advance_time(&self, t: DateTime<Utc>) -> usize {
        self.sketch.lock().advance_to(t)
    }

    /// Switch to data-derived time. Idempotent; the first activation resets
    /// the tick clock so the next event timestamp becomes the new origin.
    pub fn activate_data_clock(&self) {
        if !self.data_clock.swap(true, Ordering::SeqCst) {
            self.sketch.lock().reset_clock();
            info!("event timestamps detected; advancing time from data");
        }
    }

    pub fn data_clock_active(&self) -> bool {
        self.data_clock.load(Ordering::SeqCst)
    }

    /// Point estimate for one item.
    pub fn count(&self, item: &str) -> u32 {
        self.sketch.lock().count(item)
    }

    /// Sorted Top-K candidates (count descending, item ascending).
    pub fn sorted_items(&self) -> Vec<TopItem> {
        self.sketch.lock().sorted_items()
    }

    /// Re-read counts for `entries` in one bounded critical section.
    pub fn update_counts(&self, entries: &mut [TopItem]) {
        let sketch = self.sketch.lock();
        for entry in entries {
            entry.count = sketch.count(&entry.item);
        }
    }

    /// Per-tick history for `item`, oldest to newest.
    pub fn history_for(&self, item: &str) -> Vec<u32> {
        self.sketch.lock().history_for(item)
    }

    /// Boundary of the most recently covered tick.
    pub fn latest_tick(&self) -> Option<DateTime<Utc>> {
        self.sketch.lock().latest_tick()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn metrics(&self) -> &LatencyMetrics {
        &self.metrics
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    /// Toggle the pause gate; returns the new state.
    pub fn toggle_pause(&self) -> bool {
        self.pause.toggle()
    }

    /// Ingest/tick threads call this at their safe points.
    pub fn wait_if_paused(&self) {
        self.pause.wait_if_paused();
    }
}
