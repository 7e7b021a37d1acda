//! Count-min grid with heavy-keeper decay and per-tick count rings.
//!
//! Layout: `depth x width` buckets, row-major. Each bucket is owned by one
//! fingerprint at a time and holds a fixed ring of per-tick counts covering
//! the window. An item's estimate is the minimum aggregate across the rows
//! whose bucket it still owns, which bounds the overestimation a single
//! collision-heavy row can cause.
//!
//! Collisions decay the incumbent: an event that hashes into a bucket owned
//! by a different fingerprint decrements the incumbent's aggregate with
//! probability `decay^aggregate`, and claims the bucket once the aggregate
//! reaches zero. The probabilities come from a precomputed threshold table,
//! so the hot path compares one random `u32` against a lookup instead of
//! computing powers per event.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::hash::{bucket_index, fingerprint};
use crate::heap::{TopItem, TopKHeap};

/// Sketch dimensioning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SketchParams {
    /// Number of Top-K candidates tracked by the heap.
    pub k: usize,
    /// Buckets per row.
    pub width: usize,
    /// Number of independent rows.
    pub depth: usize,
    /// Collision decay probability base, in `[0, 1]`.
    pub decay: f64,
    /// Size of the precomputed decay threshold table.
    pub decay_lut_size: usize,
    /// Ring length: window / tick.
    pub history_len: usize,
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            k: 50,
            width: 3000,
            depth: 3,
            decay: 0.9,
            decay_lut_size: 8192,
            history_len: 10,
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    fingerprint: u64,
    /// Sum of the ring; kept in lockstep with `counts`.
    total: u32,
    /// Index of the oldest slot.
    first: usize,
    counts: Box<[u32]>,
}

impl Bucket {
    fn new(history_len: usize) -> Self {
        Self {
            fingerprint: 0,
            total: 0,
            first: 0,
            counts: vec![0; history_len].into_boxed_slice(),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.counts.len()
    }

    /// Slot holding the current (newest) tick.
    #[inline]
    fn current_slot(&self) -> usize {
        (self.first + self.len() - 1) % self.len()
    }

    /// The `j`-th slot in oldest-to-newest order.
    #[inline]
    fn slot(&self, j: usize) -> u32 {
        self.counts[(self.first + j) % self.len()]
    }

    fn deposit(&mut self, delta: u32) {
        let at = self.current_slot();
        self.counts[at] += delta;
        self.total += delta;
    }

    /// Remove one unit from the oldest nonzero slot, keeping `total` equal to
    /// the ring sum.
    fn decay_one(&mut self) {
        for j in 0..self.len() {
            let at = (self.first + j) % self.len();
            if self.counts[at] > 0 {
                self.counts[at] -= 1;
                self.total -= 1;
                return;
            }
        }
    }

    /// Slide the ring forward `n` ticks, expiring the oldest slots.
    fn rotate(&mut self, n: usize) {
        if n >= self.len() {
            self.counts.fill(0);
            self.total = 0;
            self.first = 0;
            return;
        }
        for _ in 0..n {
            self.total -= self.counts[self.first];
            self.counts[self.first] = 0;
            self.first = (self.first + 1) % self.len();
        }
    }
}

/// The count-min/heavy-keeper grid plus the Top-K candidate heap.
#[derive(Debug)]
pub struct Sketch {
    width: usize,
    depth: usize,
    history_len: usize,
    decay_lut: Box<[u32]>,
    buckets: Vec<Bucket>,
    heap: TopKHeap,
    rng: SmallRng,
}

impl Sketch {
    pub fn new(params: SketchParams) -> Self {
        Self::with_rng_seed(params, 0x7077_6174_6368)
    }

    /// Deterministic construction for tests: the decay coin flips replay
    /// identically for a given seed.
    pub fn with_rng_seed(params: SketchParams, seed: u64) -> Self {
        let width = params.width.max(1);
        let depth = params.depth.max(1);
        let history_len = params.history_len.max(1);
        Self {
            width,
            depth,
            history_len,
            decay_lut: build_decay_lut(params.decay, params.decay_lut_size),
            buckets: (0..depth * width).map(|_| Bucket::new(history_len)).collect(),
            heap: TopKHeap::new(params.k),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Count one occurrence of `item`. Returns the new estimate.
    pub fn incr(&mut self, item: &str) -> u32 {
        self.add(item, 1)
    }

    /// Count `delta` occurrences of `item`. Returns the new estimate.
    ///
    /// `add(item, n)` is equivalent to calling `incr(item)` `n` times: each
    /// unit either lands in a bucket the item owns (or can claim), or spends
    /// itself on one decay attempt against the incumbent.
    pub fn add(&mut self, item: &str, delta: u32) -> u32 {
        if delta == 0 {
            return self.count(item);
        }
        let bytes = item.as_bytes();
        let fp = fingerprint(bytes);
        for row in 0..self.depth {
            let at = row * self.width + bucket_index(bytes, row, self.width);
            let mut remaining = delta;
            while remaining > 0 {
                let bucket = &mut self.buckets[at];
                if bucket.total == 0 || bucket.fingerprint == fp {
                    bucket.fingerprint = fp;
                    bucket.deposit(remaining);
                    break;
                }
                let threshold =
                    self.decay_lut[(bucket.total as usize).min(self.decay_lut.len() - 1)];
                if self.rng.gen::<u32>() < threshold {
                    bucket.decay_one();
                }
                remaining -= 1;
            }
        }
        let estimate = min_matching_total(&self.buckets, self.width, self.depth, bytes, fp);
        if estimate > 0 {
            self.heap.offer(item, fp, estimate);
        }
        estimate
    }

    /// Estimated in-window count for `item`: the minimum aggregate across the
    /// rows whose bucket the item still owns, 0 when it owns none.
    pub fn count(&self, item: &str) -> u32 {
        let bytes = item.as_bytes();
        min_matching_total(&self.buckets, self.width, self.depth, bytes, fingerprint(bytes))
    }

    /// Advance the window by `n` ticks.
    ///
    /// Expires the oldest `n` slots of every bucket (everything, if `n` spans
    /// the whole ring), then recomputes each heap candidate from surviving
    /// bucket state and evicts the ones that expired to zero.
    pub fn ticks(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        for bucket in &mut self.buckets {
            bucket.rotate(n);
        }
        let width = self.width;
        let depth = self.depth;
        let buckets = &self.buckets;
        self.heap.resync(|entry| {
            min_matching_total(buckets, width, depth, entry.item.as_bytes(), entry.fingerprint)
        });
    }

    /// Per-tick history for `item`, oldest to newest, one slot per tick.
    ///
    /// Element-wise maximum across the rows the item still owns; all zeros if
    /// it owns none. The returned buffer is owned by the caller.
    pub fn history_for(&self, item: &str) -> Vec<u32> {
        let bytes = item.as_bytes();
        let fp = fingerprint(bytes);
        let mut series = vec![0u32; self.history_len];
        for row in 0..self.depth {
            let bucket = &self.buckets[row * self.width + bucket_index(bytes, row, self.width)];
            if bucket.fingerprint != fp {
                continue;
            }
            for (j, out) in series.iter_mut().enumerate() {
                *out = (*out).max(bucket.slot(j));
            }
        }
        series
    }

    /// Current Top-K candidates, count descending, ties by item ascending.
    pub fn sorted_items(&self) -> Vec<TopItem> {
        self.heap.sorted_items()
    }
}

fn min_matching_total(
    buckets: &[Bucket],
    width: usize,
    depth: usize,
    item: &[u8],
    fp: u64,
) -> u32 {
    let mut min: Option<u32> = None;
    for row in 0..depth {
        let bucket = &buckets[row * width + bucket_index(item, row, width)];
        if bucket.fingerprint == fp {
            min = Some(min.map_or(bucket.total, |m| m.min(bucket.total)));
        }
    }
    min.unwrap_or(0)
}

fn build_decay_lut(decay: f64, size: usize) -> Box<[u32]> {
    let size = size.max(1);
    let decay = decay.clamp(0.0, 1.0);
    let mut thresholds = Vec::with_capacity(size);
    let mut p = 1.0f64;
    for _ in 0..size {
        thresholds.push((p * f64::from(u32::MAX)) as u32);
        p *= decay;
    }
    thresholds.into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn small() -> SketchParams {
        SketchParams {
            k: 3,
            width: 1024,
            depth: 3,
            decay: 0.9,
            decay_lut_size: 256,
            history_len: 10,
        }
    }

    /// Items that occupy pairwise-disjoint buckets in every row, so the
    /// tests below see exact counts with no decay randomness.
    fn disjoint_items(params: &SketchParams, want: usize) -> Vec<String> {
        let mut chosen = Vec::with_capacity(want);
        let mut used: HashSet<(usize, usize)> = HashSet::new();
        let mut serial = 0u32;
        while chosen.len() < want {
            let candidate = format!("item-{serial:04}");
            serial += 1;
            let cells: Vec<(usize, usize)> = (0..params.depth)
                .map(|row| (row, bucket_index(candidate.as_bytes(), row, params.width)))
                .collect();
            if cells.iter().all(|cell| !used.contains(cell)) {
                used.extend(cells);
                chosen.push(candidate);
            }
        }
        chosen
    }

    #[test]
    fn counts_distinct_items_exactly() {
        let params = small();
        let items = disjoint_items(&params, 3);
        let (a, b, c) = (items[0].as_str(), items[1].as_str(), items[2].as_str());
        let mut sketch = Sketch::new(params);
        for _ in 0..100 {
            sketch.incr(a);
        }
        for _ in 0..50 {
            sketch.incr(b);
        }
        for _ in 0..10 {
            sketch.incr(c);
        }
        assert_eq!(sketch.count(a), 100);
        assert_eq!(sketch.count(b), 50);
        assert_eq!(sketch.count(c), 10);
        assert_eq!(sketch.count("never-seen"), 0);

        let top = sketch.sorted_items();
        assert_eq!(top.len(), 3);
        assert_eq!((top[0].item.as_str(), top[0].count), (a, 100));
        assert_eq!((top[1].item.as_str(), top[1].count), (b, 50));
        assert_eq!((top[2].item.as_str(), top[2].count), (c, 10));
    }

    #[test]
    fn add_deposits_into_current_tick_slot() {
        let mut sketch = Sketch::new(small());
        sketch.add("x", 7);
        let series = sketch.history_for("x");
        assert_eq!(series.len(), 10);
        assert_eq!(series[9], 7);
        assert!(series[..9].iter().all(|&c| c == 0));
    }

    #[test]
    fn ticks_expire_old_slots() {
        let mut sketch = Sketch::new(small());
        sketch.add("x", 5);
        sketch.ticks(3);
        sketch.add("x", 2);

        assert_eq!(sketch.count("x"), 7);
        let series = sketch.history_for("x");
        assert_eq!(series[9], 2);
        assert_eq!(series[6], 5);

        // Expire the first deposit: 5 landed 3 ticks ago, so 7 more ticks
        // push it out of the window.
        sketch.ticks(7);
        assert_eq!(sketch.count("x"), 2);
    }

    #[test]
    fn full_window_tick_wipes_everything() {
        let mut sketch = Sketch::new(small());
        for _ in 0..100 {
            sketch.incr("a");
        }
        sketch.add("b", 42);
        sketch.ticks(10);
        assert_eq!(sketch.count("a"), 0);
        assert_eq!(sketch.count("b"), 0);
        assert!(sketch.sorted_items().is_empty());
    }

    #[test]
    fn ticks_zero_is_a_no_op() {
        let mut sketch = Sketch::new(small());
        sketch.add("a", 9);
        let before_count = sketch.count("a");
        let before_series = sketch.history_for("a");
        let before_top = sketch.sorted_items();
        sketch.ticks(0);
        assert_eq!(sketch.count("a"), before_count);
        assert_eq!(sketch.history_for("a"), before_series);
        assert_eq!(sketch.sorted_items(), before_top);
    }

    #[test]
    fn heap_tracks_only_k_heaviest() {
        let params = SketchParams { k: 2, ..small() };
        let items = disjoint_items(&params, 3);
        let mut sketch = Sketch::new(params);
        for (item, n) in [(&items[0], 30u32), (&items[1], 20), (&items[2], 10)] {
            sketch.add(item, n);
        }
        let top = sketch.sorted_items();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].item, items[0]);
        assert_eq!(top[1].item, items[1]);
    }

    #[test]
    fn collision_decay_eventually_reassigns_bucket() {
        // One-wide grid forces every item into the same buckets; a heavy
        // newcomer must be able to wear down and displace the incumbent.
        let mut sketch = Sketch::with_rng_seed(
            SketchParams {
                k: 2,
                width: 1,
                depth: 1,
                decay: 0.9,
                decay_lut_size: 256,
                history_len: 4,
            },
            42,
        );
        sketch.add("old", 3);
        for _ in 0..200 {
            sketch.incr("new");
        }
        assert_eq!(sketch.count("old"), 0);
        assert!(sketch.count("new") > 0);
    }

    #[test]
    fn decay_lut_is_monotone_nonincreasing() {
        let lut = build_decay_lut(0.9, 64);
        assert_eq!(lut[0], u32::MAX);
        assert!(lut.windows(2).all(|w| w[0] >= w[1]));

        let frozen = build_decay_lut(1.0, 8);
        assert!(frozen.iter().all(|&t| t == u32::MAX));
    }

    #[test]
    fn history_newest_slot_matches_current_tick_count() {
        let mut sketch = Sketch::new(small());
        sketch.add("x", 4);
        sketch.ticks(1);
        sketch.add("x", 6);
        let series = sketch.history_for("x");
        assert_eq!(series[series.len() - 1], 6);
        assert_eq!(series[series.len() - 2], 4);
    }
}
