//! Cross-sectional aggregation of pair moves into per-currency strength.
//!
//! Every pair's log-return `ln(current / baseline)` is credited to its base
//! currency and debited from its quote currency, scaled by the pair's liquidity
//! weight. Each currency's weighted mean contribution forms a [`CrossSection`],
//! which a [`CrossSectionalNormalizer`] turns into display scores.

use crate::currency::{CurrencyMap, PAIRS, Pair, is_valid_price};
use itertools::{Itertools, MinMaxResult};

/// Weighted mean log-return per currency for one snapshot, plus its population statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    per_currency: CurrencyMap<f64>,
    mean: f64,
    std: f64,
}

impl CrossSection {
    /// Aggregate the canonical pairs, where `price_move` yields `(current, baseline)`.
    ///
    /// Pairs without a move, or with an invalid current or baseline price, are skipped.
    /// Currencies with no contributing pair score a mean contribution of 0.
    pub fn from_moves<F>(mut price_move: F) -> Self
    where
        F: FnMut(Pair) -> Option<(f64, f64)>,
    {
        let mut raw = CurrencyMap::splat(0.0);
        let mut weight_sums = CurrencyMap::splat(0.0);

        for pair in PAIRS {
            let Some((current, baseline)) = price_move(pair) else {
                continue;
            };
            if !is_valid_price(current) || !is_valid_price(baseline) {
                continue;
            }

            let weight = pair.liquidity_weight();
            let log_return = (current / baseline).ln();

            raw[pair.base()] += log_return * weight;
            raw[pair.quote()] -= log_return * weight;
            weight_sums[pair.base()] += weight;
            weight_sums[pair.quote()] += weight;
        }

        let per_currency = raw.map(|currency, sum| {
            let weight = weight_sums[currency];
            if weight > 0.0 { sum / weight } else { 0.0 }
        });

        Self::from_values(per_currency)
    }

    pub fn from_values(per_currency: CurrencyMap<f64>) -> Self {
        let n = per_currency.values().count() as f64;
        let mean = per_currency.values().sum::<f64>() / n;
        let variance = per_currency
            .values()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / n;

        Self {
            per_currency,
            mean,
            std: variance.sqrt(),
        }
    }

    pub fn per_currency(&self) -> &CurrencyMap<f64> {
        &self.per_currency
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> f64 {
        self.std
    }

    /// True when the cross-section has no spread to normalise.
    pub fn is_degenerate(&self) -> bool {
        !self.std.is_finite()
            || self.std == 0.0
            || self.per_currency.values().all_equal()
    }

    /// `(value - mean) / std` per currency, or `None` for a degenerate cross-section.
    pub fn z_scores(&self) -> Option<CurrencyMap<f64>> {
        if self.is_degenerate() {
            return None;
        }
        Some(self.per_currency.map(|_, value| (value - self.mean) / self.std))
    }
}

/// Policy turning a [`CrossSection`] into one score per currency.
pub trait CrossSectionalNormalizer {
    type Score;

    fn normalize(&self, section: &CrossSection) -> CurrencyMap<Self::Score>;
}

/// Offset z-scores around a 5.0 midpoint and clamp to `[0, 10]`.
///
/// Used by the real-time engine: a quiet market stays near the midpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidpointClamp {
    pub multiplier: f64,
}

impl MidpointClamp {
    pub const MIDPOINT: f64 = 5.0;
    pub const MAX: f64 = 10.0;

    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    fn score(&self, z: f64) -> f64 {
        (Self::MIDPOINT + z * self.multiplier).clamp(0.0, Self::MAX)
    }
}

impl CrossSectionalNormalizer for MidpointClamp {
    type Score = f64;

    fn normalize(&self, section: &CrossSection) -> CurrencyMap<f64> {
        match section.z_scores() {
            Some(z) => z.map(|_, z| self.score(*z)),
            None => CurrencyMap::splat(Self::MIDPOINT),
        }
    }
}

/// Stretch z-scores so the weakest currency maps to 0 and the strongest to 100.
///
/// Used by the multi-timeframe dashboard: every snapshot spans the full range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MinMaxStretch;

impl MinMaxStretch {
    pub const MIDPOINT: u8 = 50;
    pub const MAX: f64 = 100.0;
}

impl CrossSectionalNormalizer for MinMaxStretch {
    type Score = u8;

    fn normalize(&self, section: &CrossSection) -> CurrencyMap<u8> {
        let z = section
            .z_scores()
            .unwrap_or_else(|| CurrencyMap::splat(0.0));

        let (min, max) = match z.values().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(_) | MinMaxResult::NoElements => {
                return CurrencyMap::splat(Self::MIDPOINT);
            }
        };

        let spread = max - min;
        if !spread.is_finite() || spread == 0.0 {
            return CurrencyMap::splat(Self::MIDPOINT);
        }

        z.map(|_, z| {
            let scaled = ((z - min) / spread) * Self::MAX;
            scaled.clamp(0.0, Self::MAX).round() as u8
        })
    }
}
