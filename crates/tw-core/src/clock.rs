//! Time driver: wall-clock ticking and replay pacing.
//!
//! The sketch's notion of "now" advances in whole ticks. Two mutually
//! exclusive sources drive it:
//! - wall mode (the default): a background thread ticks at the configured
//!   tick size;
//! - data mode: the ingest driver advances time from event timestamps, and
//!   the wall ticker stands down the moment the pipeline's data clock
//!   activates.
//!
//! Replay pacing is a pure policy function here so the ingest drivers and
//! the tests share one definition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::pipeline::Pipeline;

/// How long to sleep before ingesting an event `current - prev` after its
/// predecessor, at `speed`x. A zero `max_sleep` means uncapped.
pub fn replay_delay(
    prev: DateTime<Utc>,
    current: DateTime<Utc>,
    speed: f64,
    max_sleep: Duration,
) -> Duration {
    let gap = current.signed_duration_since(prev);
    if gap <= TimeDelta::zero() || speed <= 0.0 {
        return Duration::ZERO;
    }
    let nanos = gap.num_nanoseconds().unwrap_or(i64::MAX).max(0) as f64 / speed;
    let mut sleep = Duration::from_nanos(nanos as u64);
    if !max_sleep.is_zero() && sleep > max_sleep {
        sleep = max_sleep;
    }
    sleep
}

/// Spawn the wall-clock ticker thread.
///
/// Every `tick`, it advances the pipeline to the current wall time - unless
/// the data clock has activated, in which case it idles (events carry time
/// from here on). The thread honors the pause gate and exits when `shutdown`
/// is set.
pub fn spawn_wall_ticker(
    pipeline: Arc<Pipeline>,
    tick: Duration,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("tw-wall-tick".to_string())
        .spawn(move || {
            let mut next = Instant::now() + tick;
            loop {
                if !sleep_until(next, &shutdown) {
                    break;
                }
                next += tick;
                pipeline.wait_if_paused();
                if pipeline.data_clock_active() {
                    continue;
                }
                let applied = pipeline.advance_time(Utc::now());
                if applied > 1 {
                    debug!(ticks = applied, "coalesced wall ticks");
                }
            }
        })
}

/// Sleep until `deadline` in short slices so shutdown stays responsive.
/// Returns false when shutdown was requested.
pub(crate) fn sleep_until(deadline: Instant, shutdown: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(100);
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLICE));
    }
}
