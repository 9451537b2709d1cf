//! Reconstruct missing canonical pair prices from the prices that are available.
//!
//! Resolution order per canonical pair:
//! 1. direct quote, or the reciprocal of the inverse quote
//! 2. single-hop USD bridge: `rate(base, USD) * rate(USD, quote)`, each leg
//!    resolved by direct-or-inverse lookup only
//!
//! Pairs that cannot be resolved stay absent. Callers must treat absence as
//! "unknown", never as zero.

use crate::currency::{Currency, PAIRS, Pair, PriceMap, is_valid_price};

/// Return a copy of `prices` with every derivable canonical pair filled in.
///
/// Existing valid entries are never overwritten and the input is never mutated.
/// Applying this to its own output is a no-op.
pub fn fill_missing_pairs(prices: &PriceMap) -> PriceMap {
    let mut filled = prices.clone();

    for pair in PAIRS {
        if quoted(&filled, &pair).is_some() {
            continue;
        }
        if let Some(rate) = derive_rate(&filled, pair.base(), pair.quote()) {
            filled.insert(pair, rate);
        }
    }

    filled
}

/// Price of one `base` in `quote`, from the direct quote or the reciprocal of the inverse.
pub fn rate(prices: &PriceMap, base: Currency, quote: Currency) -> Option<f64> {
    let direct = Pair::new(base, quote).ok()?;

    quoted(prices, &direct)
        .or_else(|| quoted(prices, &direct.inverse()).map(|inverse| 1.0 / inverse))
}

fn derive_rate(prices: &PriceMap, base: Currency, quote: Currency) -> Option<f64> {
    if let Some(direct) = rate(prices, base, quote) {
        return Some(direct);
    }

    if base == Currency::Usd || quote == Currency::Usd {
        return None;
    }

    let base_usd = rate(prices, base, Currency::Usd)?;
    let usd_quote = rate(prices, Currency::Usd, quote)?;
    Some(base_usd * usd_quote)
}

fn quoted(prices: &PriceMap, pair: &Pair) -> Option<f64> {
    prices.get(pair).copied().filter(|price| is_valid_price(*price))
}
