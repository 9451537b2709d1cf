//! The fixed currency and pair universe.
//!
//! Eight currencies, 28 canonical pairs (one direction per combination) and the
//! liquidity weights used to scale each pair's influence on strength aggregation.

use crate::error::ParseError;
use derive_more::Display;
use fnv::FnvHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

/// Liquidity weight applied to every pair without an explicit entry.
pub const DEFAULT_LIQUIDITY_WEIGHT: f64 = 0.3;

/// Latest known price per pair.
pub type PriceMap = FnvHashMap<Pair, f64>;

/// Prices are only usable when finite and strictly positive.
#[inline]
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// One of the eight tracked major currencies.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[display("USD")]
    Usd = 0,
    #[display("EUR")]
    Eur = 1,
    #[display("GBP")]
    Gbp = 2,
    #[display("JPY")]
    Jpy = 3,
    #[display("CHF")]
    Chf = 4,
    #[display("AUD")]
    Aud = 5,
    #[display("CAD")]
    Cad = 6,
    #[display("NZD")]
    Nzd = 7,
}

impl Currency {
    pub const COUNT: usize = 8;

    pub const ALL: [Currency; Currency::COUNT] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Chf,
        Currency::Aud,
        Currency::Cad,
        Currency::Nzd,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Currency {
    type Err = ParseError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "JPY" => Ok(Currency::Jpy),
            "CHF" => Ok(Currency::Chf),
            "AUD" => Ok(Currency::Aud),
            "CAD" => Ok(Currency::Cad),
            "NZD" => Ok(Currency::Nzd),
            _ => Err(ParseError::UnknownCurrency(code.to_string())),
        }
    }
}

/// Ordered (base, quote) combination of two distinct currencies, eg/ EURUSD.
///
/// Any direction can be represented (USDEUR is a valid `Pair`), but only the
/// [`PAIRS`] directions are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    base: Currency,
    quote: Currency,
}

impl Pair {
    /// Construct a new [`Pair`], rejecting identical base and quote.
    pub fn new(base: Currency, quote: Currency) -> Result<Self, ParseError> {
        if base == quote {
            return Err(ParseError::IdenticalCurrencies(base));
        }
        Ok(Self { base, quote })
    }

    const fn of(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    pub fn base(&self) -> Currency {
        self.base
    }

    pub fn quote(&self) -> Currency {
        self.quote
    }

    /// The same two currencies quoted the other way around.
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    pub fn involves(&self, currency: Currency) -> bool {
        self.base == currency || self.quote == currency
    }

    /// True if this is one of the 28 aggregated directions.
    pub fn is_canonical(&self) -> bool {
        PAIRS.contains(self)
    }

    /// Size of one pip: 0.01 for JPY-quoted pairs, else 0.0001.
    pub fn pip_size(&self) -> f64 {
        match self.quote {
            Currency::Jpy => 0.01,
            _ => 0.0001,
        }
    }

    /// Weight of this pair's contribution to currency strength aggregation.
    pub fn liquidity_weight(&self) -> f64 {
        use Currency::*;
        match (self.base, self.quote) {
            (Eur, Usd) => 1.0,
            (Usd, Jpy) => 0.9,
            (Gbp, Usd) => 0.85,
            (Aud, Usd) => 0.7,
            (Usd, Cad) => 0.65,
            (Usd, Chf) => 0.6,
            (Nzd, Usd) => 0.5,
            _ => DEFAULT_LIQUIDITY_WEIGHT,
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = ParseError;

    /// Accepts "EURUSD", "eurusd", and the broker spellings "EUR_USD" / "EUR/USD".
    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        let compact = symbol
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '/'))
            .collect::<String>();

        if compact.len() != 6 || !compact.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ParseError::MalformedPair(symbol.to_string()));
        }

        let base = compact[..3].parse()?;
        let quote = compact[3..].parse()?;
        Pair::new(base, quote)
    }
}

impl Serialize for Pair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let symbol = String::deserialize(deserializer)?;
        symbol.parse().map_err(serde::de::Error::custom)
    }
}

/// The 28 canonical pairs, USD majors first.
pub const PAIRS: [Pair; 28] = {
    use Currency::*;
    [
        // USD quote
        Pair::of(Eur, Usd),
        Pair::of(Gbp, Usd),
        Pair::of(Aud, Usd),
        Pair::of(Nzd, Usd),
        // USD base
        Pair::of(Usd, Jpy),
        Pair::of(Usd, Chf),
        Pair::of(Usd, Cad),
        // Crosses
        Pair::of(Eur, Gbp),
        Pair::of(Eur, Jpy),
        Pair::of(Eur, Chf),
        Pair::of(Eur, Aud),
        Pair::of(Eur, Cad),
        Pair::of(Eur, Nzd),
        Pair::of(Gbp, Jpy),
        Pair::of(Gbp, Chf),
        Pair::of(Gbp, Aud),
        Pair::of(Gbp, Cad),
        Pair::of(Gbp, Nzd),
        Pair::of(Aud, Jpy),
        Pair::of(Aud, Chf),
        Pair::of(Aud, Cad),
        Pair::of(Aud, Nzd),
        Pair::of(Nzd, Jpy),
        Pair::of(Nzd, Chf),
        Pair::of(Nzd, Cad),
        Pair::of(Cad, Jpy),
        Pair::of(Cad, Chf),
        Pair::of(Chf, Jpy),
    ]
};

/// The seven USD majors every multi-timeframe snapshot requires.
pub const USD_MAJORS: [Pair; 7] = {
    use Currency::*;
    [
        Pair::of(Eur, Usd),
        Pair::of(Gbp, Usd),
        Pair::of(Aud, Usd),
        Pair::of(Nzd, Usd),
        Pair::of(Usd, Cad),
        Pair::of(Usd, Chf),
        Pair::of(Usd, Jpy),
    ]
};

/// Fixed-size map holding one value per [`Currency`].
///
/// Serialises as a JSON object keyed by currency code, eg/ `{"USD": 5.0, ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CurrencyMap<T>([T; Currency::COUNT]);

impl<T> CurrencyMap<T> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(Currency) -> T,
    {
        Self(Currency::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, &T)> {
        Currency::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U, F>(&self, mut f: F) -> CurrencyMap<U>
    where
        F: FnMut(Currency, &T) -> U,
    {
        CurrencyMap::from_fn(|currency| f(currency, &self[currency]))
    }
}

impl<T: Clone> CurrencyMap<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> Index<Currency> for CurrencyMap<T> {
    type Output = T;

    fn index(&self, currency: Currency) -> &Self::Output {
        &self.0[currency.index()]
    }
}

impl<T> IndexMut<Currency> for CurrencyMap<T> {
    fn index_mut(&mut self, currency: Currency) -> &mut Self::Output {
        &mut self.0[currency.index()]
    }
}

impl<T: Serialize> Serialize for CurrencyMap<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_pairs_cover_every_combination_once() {
        let combinations = PAIRS
            .iter()
            .map(|pair| {
                let mut key = [pair.base(), pair.quote()];
                key.sort();
                key
            })
            .collect::<HashSet<_>>();

        assert_eq!(combinations.len(), 28);
        assert!(PAIRS.iter().all(|pair| pair.base() != pair.quote()));
        assert!(USD_MAJORS.iter().all(Pair::is_canonical));
        assert!(USD_MAJORS.iter().all(|pair| pair.involves(Currency::Usd)));
    }

    #[test]
    fn test_pair_from_str() {
        struct TestCase {
            input: &'static str,
            expected: Result<Pair, ParseError>,
        }

        let eurusd = Pair::new(Currency::Eur, Currency::Usd).unwrap();

        let tests = vec![
            TestCase {
                // TC0: plain symbol
                input: "EURUSD",
                expected: Ok(eurusd),
            },
            TestCase {
                // TC1: lower case with whitespace
                input: " eurusd ",
                expected: Ok(eurusd),
            },
            TestCase {
                // TC2: broker underscore spelling
                input: "EUR_USD",
                expected: Ok(eurusd),
            },
            TestCase {
                // TC3: slash spelling
                input: "EUR/USD",
                expected: Ok(eurusd),
            },
            TestCase {
                // TC4: unknown currency
                input: "XAUUSD",
                expected: Err(ParseError::UnknownCurrency("XAU".to_string())),
            },
            TestCase {
                // TC5: wrong length
                input: "EURUSDT",
                expected: Err(ParseError::MalformedPair("EURUSDT".to_string())),
            },
            TestCase {
                // TC6: identical currencies
                input: "USDUSD",
                expected: Err(ParseError::IdenticalCurrencies(Currency::Usd)),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.parse::<Pair>();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_pair_properties() {
        let usdjpy: Pair = "USDJPY".parse().unwrap();
        let eurgbp: Pair = "EURGBP".parse().unwrap();

        assert_eq!(usdjpy.to_string(), "USDJPY");
        assert_eq!(usdjpy.inverse().to_string(), "JPYUSD");
        assert!(!usdjpy.inverse().is_canonical());
        assert_eq!(usdjpy.pip_size(), 0.01);
        assert_eq!(eurgbp.pip_size(), 0.0001);
        assert_eq!(usdjpy.liquidity_weight(), 0.9);
        assert_eq!(eurgbp.liquidity_weight(), DEFAULT_LIQUIDITY_WEIGHT);
    }

    #[test]
    fn test_currency_map_serialises_as_object() {
        let mut scores = CurrencyMap::splat(50u8);
        scores[Currency::Jpy] = 0;

        let json = serde_json::to_value(scores).unwrap();
        assert_eq!(json["USD"], 50);
        assert_eq!(json["JPY"], 0);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_pair_serde_uses_symbol() {
        let pair: Pair = serde_json::from_str("\"GBP_JPY\"").unwrap();
        assert_eq!(serde_json::to_string(&pair).unwrap(), "\"GBPJPY\"");
    }
}
