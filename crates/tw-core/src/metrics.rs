//! Rolling ingest and freshness metrics.
//!
//! Bounded-memory instruments for the stats footer:
//! - `ingested_records`: monotonic counter of accepted events.
//! - ingest rate: events/second over the last `window` ingest timestamps.
//! - ingest lag: wall time since the last accepted event.
//! - rank lag p95: distribution of "refresh time minus last ingest time"
//!   over the last `window` Top-K refreshes, surfacing a refresher that
//!   cannot keep up.
//!
//! Counters are lock-free atomics; the sample rings sit behind one short
//! mutex. Every observer short-circuits when stats are disabled, and nothing
//! here can fail.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Fixed-capacity ring of scalar samples.
#[derive(Debug)]
struct ScalarRing {
    buf: Vec<i64>,
    next: usize,
    len: usize,
}

impl ScalarRing {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    fn push(&mut self, value: i64) {
        self.buf[self.next] = value;
        self.next = (self.next + 1) % self.buf.len();
        if self.len < self.buf.len() {
            self.len += 1;
        }
    }

    /// Oldest sample, newest sample, and sample count.
    fn bounds(&self) -> Option<(i64, i64, usize)> {
        if self.len == 0 {
            return None;
        }
        let newest = (self.next + self.buf.len() - 1) % self.buf.len();
        let oldest = if self.len == self.buf.len() { self.next } else { 0 };
        Some((self.buf[oldest], self.buf[newest], self.len))
    }

    /// Current samples, oldest first.
    fn samples(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.len);
        let start = (self.next + self.buf.len() - self.len) % self.buf.len();
        for i in 0..self.len {
            out.push(self.buf[(start + i) % self.buf.len()]);
        }
        out
    }
}

/// Point-in-time metrics view for the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records: u64,
    pub ingest_rps: u64,
    pub ingest_samples: usize,
    pub ingest_lag: Duration,
    pub rank_lag_p95: Duration,
    pub rank_lag_samples: usize,
}

#[derive(Debug)]
struct Rings {
    ingest_recent: ScalarRing,
    rank_lag: ScalarRing,
}

/// Ingest/freshness metrics shared by the ingest and refresh threads.
#[derive(Debug)]
pub struct LatencyMetrics {
    enabled: AtomicBool,
    ingested_records: AtomicU64,
    last_ingest_ns: AtomicI64,
    rings: Mutex<Rings>,
}

impl LatencyMetrics {
    /// `window` is the per-metric sample capacity, floored at 16.
    pub fn new(window: usize) -> Self {
        let window = window.max(16);
        Self {
            enabled: AtomicBool::new(false),
            ingested_records: AtomicU64::new(0),
            last_ingest_ns: AtomicI64::new(0),
            rings: Mutex::new(Rings {
                ingest_recent: ScalarRing::new(window),
                rank_lag: ScalarRing::new(window),
            }),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record one accepted event.
    pub fn observe_ingest(&self, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }
        let now_ns = nanos(now);
        self.ingested_records.fetch_add(1, Ordering::Relaxed);
        self.last_ingest_ns.store(now_ns, Ordering::Relaxed);
        self.rings.lock().ingest_recent.push(now_ns);
    }

    /// Record one Top-K refresh completing at `now`.
    pub fn observe_refresh(&self, now: DateTime<Utc>) {
        if !self.is_enabled() {
            return;
        }
        let now_ns = nanos(now);
        let last_ingest_ns = self.last_ingest_ns.load(Ordering::Relaxed);
        let lag_ns = if last_ingest_ns > 0 && now_ns > last_ingest_ns {
            now_ns - last_ingest_ns
        } else {
            0
        };
        self.rings.lock().rank_lag.push(lag_ns);
    }

    /// Current view of all instruments. Zeroed when disabled.
    pub fn snapshot(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        if !self.is_enabled() {
            return MetricsSnapshot::default();
        }

        let records = self.ingested_records.load(Ordering::Relaxed);
        let last_ingest_ns = self.last_ingest_ns.load(Ordering::Relaxed);

        let (ingest_bounds, lag_samples) = {
            let rings = self.rings.lock();
            (rings.ingest_recent.bounds(), rings.rank_lag.samples())
        };

        let (ingest_rps, ingest_samples) = match ingest_bounds {
            Some((oldest, newest, n)) => (recent_rate(oldest, newest, n), n),
            None => (0, 0),
        };

        let now_ns = nanos(now);
        let ingest_lag = if last_ingest_ns > 0 && now_ns > last_ingest_ns {
            Duration::from_nanos((now_ns - last_ingest_ns) as u64)
        } else {
            Duration::ZERO
        };

        let (rank_lag_p95, rank_lag_samples) = percentile95(lag_samples);

        MetricsSnapshot {
            records,
            ingest_rps,
            ingest_samples,
            ingest_lag,
            rank_lag_p95,
            rank_lag_samples,
        }
    }
}

/// Nanoseconds since the epoch, saturating past the year-2262 horizon.
fn nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Events per second across `n` samples spanning `[oldest, newest]`
/// nanoseconds, rounded half-up.
fn recent_rate(oldest: i64, newest: i64, n: usize) -> u64 {
    if n <= 1 || newest <= oldest {
        return 0;
    }
    let span_secs = (newest - oldest) as f64 / 1e9;
    let rate = (n - 1) as f64 / span_secs;
    if rate <= 0.0 {
        return 0;
    }
    (rate + 0.5) as u64
}

/// p95 of the sample set: the `floor(0.95 * (n-1))`-th element when sorted.
fn percentile95(mut samples: Vec<i64>) -> (Duration, usize) {
    if samples.is_empty() {
        return (Duration::ZERO, 0);
    }
    samples.sort_unstable();
    let pos = (0.95 * (samples.len() - 1) as f64) as usize;
    (Duration::from_nanos(samples[pos].max(0) as u64), samples.len())
}
