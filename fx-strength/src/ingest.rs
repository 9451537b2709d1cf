//! Coercion of raw price pushes into a [`PriceMap`].
//!
//! Price feeds send `{"timestamp": 1700000000000, "prices": {"EURUSD": 1.1, ...}}`,
//! sometimes with prices encoded as strings.

use crate::currency::{Pair, PriceMap};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price value as sent by a feed: a number, a numeric string, or null.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    Missing,
}

impl RawPrice {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            RawPrice::Number(price) => Some(*price),
            RawPrice::Text(text) => text.trim().parse().ok(),
            RawPrice::Missing => None,
        }
    }
}

impl From<f64> for RawPrice {
    fn from(price: f64) -> Self {
        RawPrice::Number(price)
    }
}

/// One batch of prices pushed by a feed.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PricePush {
    /// Observation time in epoch milliseconds. Receive time is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub prices: FnvHashMap<String, RawPrice>,
}

impl PricePush {
    /// Parse every symbol and price, dropping entries that are not a known pair
    /// with a numeric price.
    ///
    /// Numeric but invalid prices (zero, negative, non-finite) are kept: downstream
    /// components treat them as absent.
    pub fn into_price_map(self) -> PriceMap {
        self.prices
            .into_iter()
            .filter_map(|(symbol, raw)| {
                let pair = match symbol.parse::<Pair>() {
                    Ok(pair) => pair,
                    Err(error) => {
                        debug!(%symbol, %error, "dropping unknown symbol");
                        return None;
                    }
                };

                match raw.to_f64() {
                    Some(price) => Some((pair, price)),
                    None => {
                        debug!(%pair, ?raw, "dropping non-numeric price");
                        None
                    }
                }
            })
            .collect()
    }
}
