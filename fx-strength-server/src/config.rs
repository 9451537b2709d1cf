use fx_strength::StrengthConfig;
use std::{net::SocketAddr, time::Duration};
use tracing::warn;

pub const WS_ADDR: &str = "WS_ADDR";
pub const WS_BUFFER_SIZE: &str = "WS_BUFFER_SIZE";
pub const PRICE_BRIDGE_WS_URL: &str = "PRICE_BRIDGE_WS_URL";
pub const STRENGTH_UPDATE_INTERVAL_MS: &str = "STRENGTH_UPDATE_INTERVAL_MS";
pub const DASHBOARD_EMIT_INTERVAL_MS: &str = "DASHBOARD_EMIT_INTERVAL_MS";

const DEFAULT_ADDR: &str = "0.0.0.0:3001";

/// Server process configuration, read once at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Capacity of the outbound broadcast channel.
    pub buffer_size: usize,
    /// Upstream price bridge to follow, if any.
    pub bridge_url: Option<String>,
    pub update_interval: Duration,
    pub dashboard_emit_interval: Duration,
    pub strength: StrengthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            buffer_size: 1024,
            bridge_url: None,
            update_interval: Duration::from_millis(1000),
            dashboard_emit_interval: Duration::from_millis(5000),
            strength: StrengthConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let addr = match lookup(WS_ADDR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(name = WS_ADDR, value = %raw, "invalid address, using {DEFAULT_ADDR}");
                defaults.addr
            }),
            None => defaults.addr,
        };

        let bridge_url = lookup(PRICE_BRIDGE_WS_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Self {
            addr,
            buffer_size: positive(&lookup, WS_BUFFER_SIZE, defaults.buffer_size as u64) as usize,
            bridge_url,
            update_interval: Duration::from_millis(positive(
                &lookup,
                STRENGTH_UPDATE_INTERVAL_MS,
                defaults.update_interval.as_millis() as u64,
            )),
            dashboard_emit_interval: Duration::from_millis(positive(
                &lookup,
                DASHBOARD_EMIT_INTERVAL_MS,
                defaults.dashboard_emit_interval.as_millis() as u64,
            )),
            strength: StrengthConfig::from_lookup(&lookup),
        }
    }
}

/// Strictly positive integer option, falling back to `default`.
fn positive<F>(lookup: &F, name: &'static str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };

    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!(name, value = %raw, default, "expected a positive integer, using default");
            default
        }
    }
}
