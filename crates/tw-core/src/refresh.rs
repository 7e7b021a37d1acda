//! The rank refresh loop and the published Top-K view.
//!
//! The refresher thread owns the [`IncrementalRanker`]; nothing else touches
//! it. Each pass takes the sketch lock inside the ranker's callbacks (one
//! `sorted_items` or one batch of counts), publishes a freshly cloned
//! snapshot, and records the refresh in the metrics. Between ranker passes,
//! an optional faster cadence re-reads counts for the already-published
//! items so visible numbers stay fresh without resorting membership.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use tw_sketch::TopItem;

use crate::clock::sleep_until;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::ranker::IncrementalRanker;

/// Published Top-K snapshot. Readers get the current `Arc` without copying
/// items; publication swaps the pointer under a short lock so reads never
/// observe tearing.
#[derive(Debug, Default)]
pub struct TopKView {
    items: Mutex<Arc<Vec<TopItem>>>,
}

impl TopKView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, items: Vec<TopItem>) {
        *self.items.lock() = Arc::new(items);
    }

    pub fn current(&self) -> Arc<Vec<TopItem>> {
        self.items.lock().clone()
    }
}

/// Cadence and budget knobs for the refresher thread.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Interval between ranker passes (membership + counts).
    pub items_interval: Duration,
    /// Optional faster counts-only cadence; `None` disables it.
    pub counts_interval: Option<Duration>,
    pub full_refresh: Duration,
    pub partial_size: usize,
    pub k: usize,
}

impl RefreshSettings {
    pub fn from_config(config: &Config) -> Self {
        let items_interval = per_second(config.items_fps);
        let counts_interval = if config.item_counts_fps == 0
            || config.item_counts_fps == config.items_fps
        {
            None
        } else {
            Some(per_second(config.item_counts_fps))
        };
        Self {
            items_interval,
            counts_interval,
            full_refresh: config.full_refresh,
            partial_size: config.partial_size,
            k: config.k,
        }
    }
}

fn per_second(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Spawn the refresher thread.
pub fn spawn_refresher(
    pipeline: Arc<Pipeline>,
    view: Arc<TopKView>,
    settings: RefreshSettings,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("tw-refresh".to_string())
        .spawn(move || {
            let mut ranker =
                IncrementalRanker::new(settings.k, settings.full_refresh, settings.partial_size);
            let mut next_items = Instant::now() + settings.items_interval;
            let mut next_counts = settings.counts_interval.map(|d| Instant::now() + d);

            loop {
                let next = match next_counts {
                    Some(counts) => next_items.min(counts),
                    None => next_items,
                };
                if !sleep_until(next, &shutdown) {
                    break;
                }

                // Schedule relative to now so a long pause does not turn
                // into a burst of catch-up passes.
                let now = Instant::now();
                if now >= next_items {
                    next_items = now + settings.items_interval;
                    if !pipeline.is_paused() {
                        refresh_once(&pipeline, &view, &mut ranker);
                    }
                } else if let Some(counts_at) = next_counts {
                    if now >= counts_at {
                        next_counts =
                            settings.counts_interval.map(|interval| now + interval);
                        if !pipeline.is_paused() {
                            refresh_counts_only(&pipeline, &view);
                        }
                    }
                }
            }
        })
}

/// One ranker pass: full or partial per its own policy.
fn refresh_once(pipeline: &Pipeline, view: &TopKView, ranker: &mut IncrementalRanker) {
    let (items, did_full) = ranker.refresh(
        Utc::now(),
        0,
        || pipeline.sorted_items(),
        |slice| pipeline.update_counts(slice),
    );
    pipeline.metrics().observe_refresh(Utc::now());
    if did_full {
        debug!(items = items.len(), "full top-k refresh");
    }
    view.publish(items);
}

/// Counts-only pass over the already-published items.
fn refresh_counts_only(pipeline: &Pipeline, view: &TopKView) {
    let mut items = (*view.current()).clone();
    if items.is_empty() {
        return;
    }
    pipeline.update_counts(&mut items);
    view.publish(items);
}
