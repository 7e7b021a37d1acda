//! Incremental Top-K ranker.
//!
//! A full `sorted_items()` plus a per-item count pass are each O(K) of
//! sketch-lock time; doing both at every UI frame can starve ingest. The
//! ranker amortizes the work: membership churn is handled by periodic full
//! refreshes, and in between, a rotating slice of the current view gets its
//! counts re-read and the view re-sorted. The two callbacks exist so the
//! sketch lock is taken inside the refresh (once per batch), never around it.

use chrono::{DateTime, TimeDelta, Utc};
use tw_sketch::TopItem;

/// Budgeted Top-K view maintainer. Owned by the refresh loop; never shared.
#[derive(Debug)]
pub struct IncrementalRanker {
    k: usize,
    /// Zero means a full refresh on every call.
    full_refresh: TimeDelta,
    /// Zero means the auto budget applies.
    partial_size: usize,
    auto_budget: usize,

    last_full_refresh: Option<DateTime<Utc>>,
    items: Vec<TopItem>,
    partial_cursor: usize,
}

impl IncrementalRanker {
    pub fn new(k: usize, full_refresh: std::time::Duration, partial_size: usize) -> Self {
        let k = k.max(1);
        // Auto mode refreshes about half of Top-K per pass.
        let mut auto_budget = k / 2;
        if auto_budget < 1 {
            auto_budget = 1;
        }
        if k >= 10 && auto_budget < 10 {
            auto_budget = 10;
        }
        if auto_budget > 100 {
            auto_budget = 100;
        }
        if auto_budget > k {
            auto_budget = k;
        }
        Self {
            k,
            full_refresh: TimeDelta::from_std(full_refresh).unwrap_or(TimeDelta::MAX),
            partial_size,
            auto_budget,
            last_full_refresh: None,
            items: Vec::new(),
            partial_cursor: 0,
        }
    }

    /// Refresh the Top-K view and return a snapshot plus whether this was a
    /// full rebuild.
    ///
    /// `sorted_fn` pulls a fresh sorted view from the sketch (full refresh);
    /// `update_fn` re-reads counts for a slice of the current view (partial
    /// refresh). `budget` caps the partial slice; zero means the auto budget.
    pub fn refresh<S, U>(
        &mut self,
        now: DateTime<Utc>,
        budget: usize,
        sorted_fn: S,
        mut update_fn: U,
    ) -> (Vec<TopItem>, bool)
    where
        S: FnOnce() -> Vec<TopItem>,
        U: FnMut(&mut [TopItem]),
    {
        let need_full = self.items.is_empty()
            || self.full_refresh == TimeDelta::zero()
            || match self.last_full_refresh {
                None => true,
                Some(last) => now.signed_duration_since(last) >= self.full_refresh,
            };

        if need_full {
            let mut discovered = sorted_fn();
            discovered.truncate(self.k);
            self.items = discovered;
            self.partial_cursor = 0;
            self.last_full_refresh = Some(now);
            return (self.items.clone(), true);
        }

        let len = self.items.len();
        let limit = if self.partial_size > 0 {
            self.partial_size.min(len)
        } else {
            let budget = if budget > 0 { budget } else { self.auto_budget };
            budget.min(len)
        };

        if limit >= len {
            update_fn(&mut self.items);
        } else {
            let start = self.partial_cursor % len;
            let end = start + limit;
            if end <= len {
                update_fn(&mut self.items[start..end]);
            } else {
                update_fn(&mut self.items[start..]);
                update_fn(&mut self.items[..end - len]);
            }
            self.partial_cursor = (start + limit) % len;
        }

        // Stable sort keeps the lexicographic tie order the last full refresh
        // established, so equal-count neighbors hold their screen positions.
        self.items
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.item.cmp(&b.item)));

        while self.items.last().is_some_and(|entry| entry.count == 0) {
            self.items.pop();
        }
        if self.items.is_empty() {
            self.partial_cursor = 0;
        }

        (self.items.clone(), false)
    }
}
