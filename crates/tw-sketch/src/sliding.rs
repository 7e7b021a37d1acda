//! Sliding-window shell over the sketch.
//!
//! Owns the tick bookkeeping: timestamps (wall or event time) are truncated
//! to tick boundaries, and the elapsed whole ticks since the last advance
//! are applied as one `ticks(n)` call. The first timestamp only seeds the
//! clock; time never moves backwards.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::heap::TopItem;
use crate::sketch::{Sketch, SketchParams};

#[derive(Debug)]
pub struct SlidingTopK {
    sketch: Sketch,
    tick_us: i64,
    last_index: Option<i64>,
}

impl SlidingTopK {
    /// `params.history_len` must equal `window / tick`; the caller validates
    /// divisibility before construction.
    pub fn new(params: SketchParams, tick: Duration) -> Self {
        Self {
            sketch: Sketch::new(params),
            tick_us: (tick.as_micros().max(1)) as i64,
            last_index: None,
        }
    }

    pub fn incr(&mut self, item: &str) -> u32 {
        self.sketch.incr(item)
    }

    pub fn add(&mut self, item: &str, delta: u32) -> u32 {
        self.sketch.add(item, delta)
    }

    pub fn count(&self, item: &str) -> u32 {
        self.sketch.count(item)
    }

    pub fn sorted_items(&self) -> Vec<TopItem> {
        self.sketch.sorted_items()
    }

    pub fn history_for(&self, item: &str) -> Vec<u32> {
        self.sketch.history_for(item)
    }

    pub fn history_len(&self) -> usize {
        self.sketch.history_len()
    }

    /// Advance the window directly by `n` ticks.
    pub fn ticks(&mut self, n: usize) {
        self.sketch.ticks(n);
    }

    /// Advance the window to cover `t`.
    ///
    /// Returns the number of ticks applied. The first call after construction
    /// (or after `reset_clock`) seeds the clock and applies none; timestamps
    /// at or before the last seen tick apply none.
    pub fn advance_to(&mut self, t: DateTime<Utc>) -> usize {
        let index = t.timestamp_micros().div_euclid(self.tick_us);
        match self.last_index {
            None => {
                self.last_index = Some(index);
                0
            }
            Some(last) if index > last => {
                let n = (index - last) as usize;
                self.sketch.ticks(n);
                self.last_index = Some(index);
                n
            }
            Some(_) => 0,
        }
    }

    /// Forget the tick position, so the next `advance_to` re-seeds the clock.
    /// Used when the time source switches from wall time to event time.
    pub fn reset_clock(&mut self) {
        self.last_index = None;
    }

    /// Boundary of the most recently covered tick, if the clock is seeded.
    pub fn latest_tick(&self) -> Option<DateTime<Utc>> {
        self.last_index
            .and_then(|index| index.checked_mul(self.tick_us))
            .and_then(DateTime::from_timestamp_micros)
    }
}
