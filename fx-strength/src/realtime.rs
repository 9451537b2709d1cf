//! Smoothed real-time currency strength on a 0-10 scale.
//!
//! Keeps a short rolling price history per pair. Each recomputation compares the
//! current price with the price `lookback_samples` pushes ago, aggregates the
//! weighted log-returns per currency, offsets the z-scores around 5.0 and blends
//! the result with the previous output.

use crate::{
    config::StrengthConfig,
    currency::{CurrencyMap, Pair, PriceMap, is_valid_price},
    normalize::{CrossSection, CrossSectionalNormalizer, MidpointClamp},
};
use fnv::FnvHashMap;
use std::collections::VecDeque;
use tracing::debug;

/// Current, previous and recent prices for one pair.
#[derive(Debug, Clone)]
struct PairTrack {
    current: f64,
    previous: Option<f64>,
    history: VecDeque<f64>,
}

impl PairTrack {
    fn new(price: f64, max_history: usize) -> Self {
        let mut history = VecDeque::with_capacity(max_history.min(256));
        history.push_back(price);
        Self {
            current: price,
            previous: None,
            history,
        }
    }

    fn update(&mut self, price: f64, max_history: usize) {
        self.previous = Some(self.current);
        self.current = price;
        self.history.push_back(price);
        while self.history.len() > max_history {
            self.history.pop_front();
        }
    }

    /// The sample `lookback` pushes back, falling back to the previous price
    /// while the history is still too short.
    fn baseline(&self, lookback: usize) -> Option<f64> {
        if self.history.len() > lookback {
            self.history.get(self.history.len() - 1 - lookback).copied()
        } else {
            self.previous
        }
    }
}

/// Real-time strength engine with its own per-pair price history.
#[derive(Debug, Clone)]
pub struct StrengthEngine {
    lookback_samples: usize,
    max_history_samples: usize,
    smoothing_alpha: f64,
    normalizer: MidpointClamp,
    pairs: FnvHashMap<Pair, PairTrack>,
    smoothed: Option<CurrencyMap<f64>>,
}

impl Default for StrengthEngine {
    fn default() -> Self {
        Self::new(&StrengthConfig::default())
    }
}

impl StrengthEngine {
    pub fn new(config: &StrengthConfig) -> Self {
        Self {
            lookback_samples: config.lookback_samples,
            max_history_samples: config.max_history_samples.max(config.lookback_samples + 1),
            smoothing_alpha: if config.smoothing_enabled() {
                config.smoothing_alpha
            } else {
                0.0
            },
            normalizer: MidpointClamp::new(config.z_multiplier),
            pairs: FnvHashMap::default(),
            smoothed: None,
        }
    }

    /// Record `price` as the current price of `pair`, demoting the old current to previous.
    ///
    /// Non-finite and non-positive prices are ignored. Returns whether the price was recorded.
    pub fn update_price(&mut self, pair: Pair, price: f64) -> bool {
        if !is_valid_price(price) {
            debug!(%pair, price, "ignoring invalid price");
            return false;
        }

        let max_history = self.max_history_samples;
        self.pairs
            .entry(pair)
            .and_modify(|track| track.update(price, max_history))
            .or_insert_with(|| PairTrack::new(price, max_history));
        true
    }

    /// Record every price in `prices`. Returns the number recorded.
    pub fn update_prices(&mut self, prices: &PriceMap) -> usize {
        let mut recorded = 0;
        for (pair, price) in prices {
            if self.update_price(*pair, *price) {
                recorded += 1;
            }
        }
        recorded
    }

    pub fn current_price(&self, pair: &Pair) -> Option<f64> {
        self.pairs.get(pair).map(|track| track.current)
    }

    /// Price the next recomputation compares `pair` against.
    pub fn baseline_price(&self, pair: &Pair) -> Option<f64> {
        self.pairs
            .get(pair)
            .and_then(|track| track.baseline(self.lookback_samples))
    }

    /// Latest price of every tracked pair.
    pub fn prices(&self) -> PriceMap {
        self.pairs
            .iter()
            .map(|(pair, track)| (*pair, track.current))
            .collect()
    }

    /// Recompute the 0-10 strength score of every currency.
    ///
    /// A flat cross-section yields exactly 5.0 for every currency and resets the
    /// smoothing state to that flat output.
    pub fn calculate_strengths(&mut self) -> CurrencyMap<f64> {
        let section = CrossSection::from_moves(|pair| {
            let track = self.pairs.get(&pair)?;
            Some((track.current, track.baseline(self.lookback_samples)?))
        });

        let target = self.normalizer.normalize(&section);

        let strengths = match (&self.smoothed, section.is_degenerate()) {
            (Some(previous), false) if self.smoothing_alpha > 0.0 => {
                let alpha = self.smoothing_alpha;
                target.map(|currency, target| {
                    previous[currency] * alpha + target * (1.0 - alpha)
                })
            }
            _ => target,
        };

        self.smoothed = Some(strengths);
        strengths
    }
}
