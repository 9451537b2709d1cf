//! Multi-timeframe 0-100 currency strength rankings and pair-move heatmap.
//!
//! For every [`Timeframe`] the engine compares a "now" snapshot against a
//! "now - window" snapshot taken from the [`PriceHistoryStore`]. Both snapshots
//! need every required benchmark pair, and both are completed through
//! [`fill_missing_pairs`] before aggregation.

use crate::{
    currency::{CurrencyMap, PAIRS, Pair, PriceMap, USD_MAJORS},
    history::PriceHistoryStore,
    normalize::{CrossSection, CrossSectionalNormalizer, MinMaxStretch},
    triangulate::fill_missing_pairs,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Fixed dashboard comparison window.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
pub enum Timeframe {
    #[display("5m")]
    #[serde(rename = "5m")]
    M5,
    #[display("15m")]
    #[serde(rename = "15m")]
    M15,
    #[display("30m")]
    #[serde(rename = "30m")]
    M30,
    #[display("1h")]
    #[serde(rename = "1h")]
    H1,
    #[display("4h")]
    #[serde(rename = "4h")]
    H4,
    #[display("12h")]
    #[serde(rename = "12h")]
    H12,
    #[display("24h")]
    #[serde(rename = "24h")]
    H24,
    #[display("1w")]
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H12,
        Timeframe::H24,
        Timeframe::W1,
    ];

    /// Window length in milliseconds.
    ///
    /// "1w" is a trading week of 5 x 24h, not a calendar week.
    pub const fn duration_ms(self) -> i64 {
        match self {
            Timeframe::M5 => 5 * MINUTE_MS,
            Timeframe::M15 => 15 * MINUTE_MS,
            Timeframe::M30 => 30 * MINUTE_MS,
            Timeframe::H1 => HOUR_MS,
            Timeframe::H4 => 4 * HOUR_MS,
            Timeframe::H12 => 12 * HOUR_MS,
            Timeframe::H24 => DAY_MS,
            Timeframe::W1 => 5 * DAY_MS,
        }
    }

    /// Start of the window ending at `at`, or `None` when it precedes `i64::MIN`.
    pub fn baseline(self, at: i64) -> Option<i64> {
        at.checked_sub(self.duration_ms())
    }
}

/// Per-timeframe 0-100 scores at one instant. `None` marks insufficient history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub at: i64,
    pub scores_by_tf: BTreeMap<Timeframe, Option<CurrencyMap<u8>>>,
}

/// Move of one canonical pair across a timeframe window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairMove {
    pub pair: Pair,
    /// Rounded to 1 decimal.
    pub pips: f64,
    /// Rounded to 3 decimals.
    pub percent: f64,
}

impl PairMove {
    fn between(pair: Pair, now: f64, past: f64) -> Self {
        let pips = (now - past) / pair.pip_size();
        let percent = (now / past - 1.0) * 100.0;
        Self {
            pair,
            pips: (pips * 10.0).round() / 10.0,
            percent: (percent * 1000.0).round() / 1000.0,
        }
    }

    fn flat(pair: Pair) -> Self {
        Self {
            pair,
            pips: 0.0,
            percent: 0.0,
        }
    }
}

/// Per-timeframe pair moves at one instant. `None` marks insufficient history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapSnapshot {
    pub at: i64,
    pub values_by_tf: BTreeMap<Timeframe, Option<Vec<PairMove>>>,
}

/// Triangulated "now" and "baseline" prices for one window.
#[derive(Debug, Clone)]
struct WindowPrices {
    now: PriceMap,
    past: PriceMap,
}

impl WindowPrices {
    fn get(&self, pair: &Pair) -> Option<(f64, f64)> {
        Some((*self.now.get(pair)?, *self.past.get(pair)?))
    }
}

/// Multi-timeframe strength ranking over a shared [`PriceHistoryStore`].
#[derive(Debug, Clone)]
pub struct DashboardEngine {
    required: Vec<Pair>,
    normalizer: MinMaxStretch,
}

impl Default for DashboardEngine {
    fn default() -> Self {
        Self::new(USD_MAJORS)
    }
}

impl DashboardEngine {
    /// Construct a new [`DashboardEngine`] requiring `required` at both ends of every window.
    pub fn new<Iter>(required: Iter) -> Self
    where
        Iter: IntoIterator<Item = Pair>,
    {
        Self {
            required: required.into_iter().collect(),
            normalizer: MinMaxStretch,
        }
    }

    pub fn required(&self) -> &[Pair] {
        &self.required
    }

    /// Score every timeframe at `at`, defaulting to the store's latest observation time.
    ///
    /// Returns `None` only when no time is given and nothing has been ingested.
    pub fn calculate_all(
        &self,
        store: &PriceHistoryStore,
        at: Option<i64>,
    ) -> Option<DashboardSnapshot> {
        let at = at.or_else(|| store.latest_time())?;

        let scores_by_tf: BTreeMap<_, _> = Timeframe::ALL
            .into_iter()
            .map(|timeframe| {
                let scores = timeframe
                    .baseline(at)
                    .and_then(|baseline| self.calculate_window(store, at, baseline));
                if scores.is_none() {
                    debug!(%timeframe, at, "insufficient history for timeframe");
                }
                (timeframe, scores)
            })
            .collect();

        Some(DashboardSnapshot { at, scores_by_tf })
    }

    /// 0-100 score per currency for the move between `baseline_time` and `at`.
    pub fn calculate_window(
        &self,
        store: &PriceHistoryStore,
        at: i64,
        baseline_time: i64,
    ) -> Option<CurrencyMap<u8>> {
        let window = self.window_prices(store, at, baseline_time)?;
        let section = CrossSection::from_moves(|pair| window.get(&pair));
        Some(self.normalizer.normalize(&section))
    }

    /// Pip and percent move of all 28 canonical pairs for every timeframe.
    ///
    /// Within a satisfied timeframe, a pair missing from either snapshot reports a
    /// flat move rather than `None`.
    pub fn heatmap(
        &self,
        store: &PriceHistoryStore,
        at: Option<i64>,
    ) -> Option<HeatmapSnapshot> {
        let at = at.or_else(|| store.latest_time())?;

        let values_by_tf: BTreeMap<_, _> = Timeframe::ALL
            .into_iter()
            .map(|timeframe| {
                let moves = timeframe
                    .baseline(at)
                    .and_then(|baseline| self.window_prices(store, at, baseline))
                    .map(|window| {
                        PAIRS
                            .into_iter()
                            .map(|pair| match window.get(&pair) {
                                Some((now, past)) => PairMove::between(pair, now, past),
                                None => PairMove::flat(pair),
                            })
                            .collect::<Vec<_>>()
                    });
                (timeframe, moves)
            })
            .collect();

        Some(HeatmapSnapshot { at, values_by_tf })
    }

    fn window_prices(
        &self,
        store: &PriceHistoryStore,
        at: i64,
        baseline_time: i64,
    ) -> Option<WindowPrices> {
        let mut now = PriceMap::default();
        let mut past = PriceMap::default();

        for pair in &self.required {
            now.insert(*pair, store.price_at_or_before(pair, at)?.mid);
            past.insert(*pair, store.price_at_or_before(pair, baseline_time)?.mid);
        }

        Some(WindowPrices {
            now: fill_missing_pairs(&now),
            past: fill_missing_pairs(&past),
        })
    }
}
