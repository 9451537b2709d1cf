//! Strength pipeline configuration derived from environment variables.
//!
//! Every option has a documented default. Missing, unparseable, non-finite or
//! out-of-range values are logged and replaced by that default.

use crate::error::ConfigError;
use tracing::warn;

pub const PRICE_HISTORY_MAX_SAMPLES: &str = "PRICE_HISTORY_MAX_SAMPLES";
pub const STRENGTH_LOOKBACK_SAMPLES: &str = "STRENGTH_LOOKBACK_SAMPLES";
pub const STRENGTH_MAX_HISTORY_SAMPLES: &str = "STRENGTH_MAX_HISTORY_SAMPLES";
pub const STRENGTH_Z_MULTIPLIER: &str = "STRENGTH_Z_MULTIPLIER";
pub const STRENGTH_SMOOTHING_ALPHA: &str = "STRENGTH_SMOOTHING_ALPHA";

/// Configuration shared by the price history store and the real-time strength engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthConfig {
    /// Samples retained per symbol by the price history store (7d @ 1/min).
    pub history_capacity: usize,
    /// Samples back in a pair's rolling history used as the return baseline.
    pub lookback_samples: usize,
    /// Rolling history retained per pair by the real-time engine.
    pub max_history_samples: usize,
    /// How far z-scores are spread away from the 5.0 midpoint.
    pub z_multiplier: f64,
    /// Exponential smoothing factor: 0 disables smoothing.
    pub smoothing_alpha: f64,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10_080,
            lookback_samples: 15,
            max_history_samples: 240,
            z_multiplier: 1.7,
            smoothing_alpha: 0.25,
        }
    }
}

impl StrengthConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let history_capacity = resolve(
            read_usize(&lookup, PRICE_HISTORY_MAX_SAMPLES, |v| v > 10, "an integer > 10"),
            defaults.history_capacity,
        );

        let lookback_samples = resolve(
            read_usize(&lookup, STRENGTH_LOOKBACK_SAMPLES, |v| v >= 1, "an integer >= 1"),
            defaults.lookback_samples,
        );

        let max_history_samples = resolve(
            read_usize(&lookup, STRENGTH_MAX_HISTORY_SAMPLES, |v| v >= 1, "an integer >= 1"),
            defaults.max_history_samples,
        )
        .max(lookback_samples + 1);

        let z_multiplier = resolve(
            read_f64(&lookup, STRENGTH_Z_MULTIPLIER, f64::is_finite, "a finite number"),
            defaults.z_multiplier,
        );

        let smoothing_alpha = resolve(
            read_f64(
                &lookup,
                STRENGTH_SMOOTHING_ALPHA,
                |v| (0.0..1.0).contains(&v),
                "a value in [0, 1)",
            ),
            defaults.smoothing_alpha,
        );

        Self {
            history_capacity,
            lookback_samples,
            max_history_samples,
            z_multiplier,
            smoothing_alpha,
        }
    }

    /// True if consecutive real-time outputs are exponentially smoothed.
    pub fn smoothing_enabled(&self) -> bool {
        self.smoothing_alpha > 0.0 && self.smoothing_alpha < 1.0
    }
}

fn resolve<T>(value: Result<Option<T>, ConfigError>, default: T) -> T {
    match value {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(error) => {
            warn!(%error, "invalid strength configuration, using default");
            default
        }
    }
}

fn read_raw<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_usize<F>(
    lookup: &F,
    name: &'static str,
    valid: impl Fn(usize) -> bool,
    expected: &'static str,
) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = read_raw(lookup, name) else {
        return Ok(None);
    };

    let value = raw.parse::<usize>().map_err(|_| ConfigError::Unparseable {
        name,
        value: raw.clone(),
    })?;

    if valid(value) {
        Ok(Some(value))
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value: value as f64,
            expected,
        })
    }
}

fn read_f64<F>(
    lookup: &F,
    name: &'static str,
    valid: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<Option<f64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = read_raw(lookup, name) else {
        return Ok(None);
    };

    let value = raw.parse::<f64>().map_err(|_| ConfigError::Unparseable {
        name,
        value: raw.clone(),
    })?;

    if valid(value) {
        Ok(Some(value))
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}
