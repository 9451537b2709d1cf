use crate::currency::Currency;
use thiserror::Error;

/// Errors produced while parsing currency codes and pair symbols.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Error)]
pub enum ParseError {
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("malformed pair symbol: {0}")]
    MalformedPair(String),

    #[error("pair base and quote are both {0}")]
    IdenticalCurrencies(Currency),
}

/// Errors produced while reading strength configuration from the environment.
///
/// These never abort start-up: the offending option is logged and replaced by its default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name}={value:?} is not a valid number")]
    Unparseable { name: &'static str, value: String },

    #[error("{name}={value} is out of range, expected {expected}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        struct TestCase {
            input: Box<dyn std::error::Error>,
            expected: &'static str,
        }

        let tests = vec![
            TestCase {
                // TC0: unknown currency
                input: Box::new(ParseError::UnknownCurrency("XAU".to_string())),
                expected: "unknown currency code: XAU",
            },
            TestCase {
                // TC1: identical currencies
                input: Box::new(ParseError::IdenticalCurrencies(Currency::Usd)),
                expected: "pair base and quote are both USD",
            },
            TestCase {
                // TC2: config out of range
                input: Box::new(ConfigError::OutOfRange {
                    name: "STRENGTH_SMOOTHING_ALPHA",
                    value: 1.5,
                    expected: "a value in [0, 1)",
                }),
                expected: "STRENGTH_SMOOTHING_ALPHA=1.5 is out of range, expected a value in [0, 1)",
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(test.input.to_string(), test.expected, "TC{} failed", index);
        }
    }
}
