/// FX Strength - Currency Strength Aggregation
///
/// Ranks the eight major currencies (USD, EUR, GBP, JPY, CHF, AUD, CAD, NZD) from
/// streams of pair prices:
/// - real-time: smoothed 0-10 scores from short rolling returns
/// - dashboard: 0-100 rankings over fixed windows from 5m to 1w
///
/// The library includes:
/// - The fixed currency and 28-pair universe
/// - A bounded per-pair price history store with point-in-time lookup
/// - A pair triangulator completing partial price snapshots through USD
/// - `StrengthService`, the single owner that ingests pushes and recomputes
pub mod config;
pub mod currency;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod ingest;
pub mod normalize;
pub mod realtime;
pub mod service;
pub mod triangulate;

// Re-export commonly used types for convenience
pub use config::StrengthConfig;
pub use currency::{Currency, CurrencyMap, PAIRS, Pair, PriceMap, USD_MAJORS};
pub use error::{ConfigError, ParseError};

pub use dashboard::{DashboardEngine, DashboardSnapshot, HeatmapSnapshot, PairMove, Timeframe};
pub use history::{PriceHistoryStore, PriceSample};
pub use ingest::{PricePush, RawPrice};
pub use realtime::StrengthEngine;
pub use service::{IngestReport, StrengthService, StrengthUpdate, Tick};
pub use triangulate::fill_missing_pairs;
