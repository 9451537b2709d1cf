//! Bounded per-pair price history with point-in-time lookup.
//!
//! Each pair owns a time-ordered ring of samples. Once a series exceeds its
//! capacity the oldest samples are evicted from the front.

use crate::currency::{Pair, PriceMap, is_valid_price};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Default samples retained per pair: 7 days at one sample per minute.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_080;

/// Mid price observed for one pair at `time` (epoch milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PriceSample {
    pub time: i64,
    pub mid: f64,
}

/// Append-only store of [`PriceSample`] series, keyed by [`Pair`].
#[derive(Debug, Clone)]
pub struct PriceHistoryStore {
    capacity: usize,
    series: FnvHashMap<Pair, VecDeque<PriceSample>>,
    latest_time: Option<i64>,
}

impl Default for PriceHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PriceHistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: FnvHashMap::default(),
            latest_time: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record every valid price in `prices` as observed at `at`.
    ///
    /// Non-finite and non-positive prices are dropped. Samples older than the
    /// tail of a series are inserted in time order rather than appended, so
    /// lookups stay correct when pushes arrive out of order. Returns the number
    /// of samples stored.
    pub fn add_prices(&mut self, prices: &PriceMap, at: i64) -> usize {
        self.latest_time = Some(self.latest_time.map_or(at, |latest| latest.max(at)));

        let mut stored = 0;
        for (pair, &mid) in prices {
            if !is_valid_price(mid) {
                debug!(%pair, mid, "dropping invalid price");
                continue;
            }
            self.insert(*pair, PriceSample { time: at, mid });
            stored += 1;
        }
        stored
    }

    fn insert(&mut self, pair: Pair, sample: PriceSample) {
        let series = self
            .series
            .entry(pair)
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(1024)));

        match series.back().copied() {
            Some(last) if sample.time < last.time => {
                debug!(%pair, time = sample.time, last = last.time, "out-of-order sample");
                let index = series.partition_point(|s| s.time <= sample.time);
                series.insert(index, sample);
            }
            _ => series.push_back(sample),
        }

        while series.len() > self.capacity {
            series.pop_front();
        }
    }

    /// Time of the most recent ingestion, if anything has been ingested.
    pub fn latest_time(&self) -> Option<i64> {
        self.latest_time
    }

    /// Latest sample for `pair` with `time <= target`.
    ///
    /// Returns `None` for an unknown pair, an empty series, or a `target`
    /// preceding the first sample.
    pub fn price_at_or_before(&self, pair: &Pair, target: i64) -> Option<PriceSample> {
        let series = self.series.get(pair)?;

        match series.back() {
            Some(last) if target >= last.time => Some(*last),
            Some(_) => {
                let after = series.partition_point(|s| s.time <= target);
                after.checked_sub(1).and_then(|index| series.get(index)).copied()
            }
            None => None,
        }
    }

    /// Number of samples held for `pair`.
    pub fn len(&self, pair: &Pair) -> usize {
        self.series.get(pair).map_or(0, VecDeque::len)
    }

    /// Oldest retained sample for `pair`.
    pub fn first(&self, pair: &Pair) -> Option<PriceSample> {
        self.series.get(pair).and_then(|series| series.front()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(VecDeque::is_empty)
    }
}
