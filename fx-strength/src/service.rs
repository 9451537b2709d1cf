//! Single owner of the strength pipeline state.
//!
//! [`StrengthService`] serialises ingestion and recomputation: the history store
//! and the real-time engine each sit behind their own lock, and no lock is ever
//! held while acquiring another.

use crate::{
    config::StrengthConfig,
    currency::{CurrencyMap, Pair, PriceMap, is_valid_price},
    dashboard::{DashboardEngine, DashboardSnapshot, HeatmapSnapshot},
    history::PriceHistoryStore,
    realtime::StrengthEngine,
    triangulate::fill_missing_pairs,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info};

/// Default minimum gap between two dashboard emissions.
pub const DEFAULT_DASHBOARD_EMIT_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of ingesting one price push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub at: i64,
    /// Symbols in the push.
    pub received: usize,
    /// Pairs fed to the real-time engine after triangulation.
    pub updated: usize,
    /// Price change per pair versus the previous push.
    pub deltas: BTreeMap<Pair, f64>,
    pub strengths: CurrencyMap<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Realtime,
}

/// Real-time strength scores computed at `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrengthUpdate {
    pub strengths: CurrencyMap<f64>,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: UpdateKind,
}

impl StrengthUpdate {
    pub fn realtime(strengths: CurrencyMap<f64>, timestamp: i64) -> Self {
        Self {
            strengths,
            timestamp,
            kind: UpdateKind::Realtime,
        }
    }
}

/// Output of one [`StrengthService::tick`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub strengths: StrengthUpdate,
    /// Present when the dashboard is due for emission.
    pub dashboard: Option<DashboardSnapshot>,
}

#[derive(Debug, Default)]
struct PublishState {
    last_prices: PriceMap,
    pushes: u64,
    dashboard_pushes: u64,
    last_dashboard: Option<DashboardSnapshot>,
    last_dashboard_emit: Option<i64>,
    last_strengths: Option<StrengthUpdate>,
}

#[derive(Debug)]
pub struct StrengthService {
    store: Mutex<PriceHistoryStore>,
    engine: Mutex<StrengthEngine>,
    dashboard: DashboardEngine,
    dashboard_emit_interval_ms: i64,
    state: Mutex<PublishState>,
}

impl Default for StrengthService {
    fn default() -> Self {
        Self::new(StrengthConfig::default())
    }
}

impl StrengthService {
    pub fn new(config: StrengthConfig) -> Self {
        Self {
            store: Mutex::new(PriceHistoryStore::new(config.history_capacity)),
            engine: Mutex::new(StrengthEngine::new(&config)),
            dashboard: DashboardEngine::default(),
            dashboard_emit_interval_ms: duration_ms(DEFAULT_DASHBOARD_EMIT_INTERVAL),
            state: Mutex::new(PublishState::default()),
        }
    }

    pub fn with_dashboard_emit_interval(mut self, interval: Duration) -> Self {
        self.dashboard_emit_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_dashboard_engine(mut self, dashboard: DashboardEngine) -> Self {
        self.dashboard = dashboard;
        self
    }

    /// Ingest one price push observed at `at`, or now when `at` is absent.
    ///
    /// The triangulated push feeds the real-time engine while only the raw push
    /// is appended to the history store.
    pub fn ingest(&self, prices: &PriceMap, at: Option<i64>) -> IngestReport {
        let at = at.unwrap_or_else(now_ms);
        let filled = fill_missing_pairs(prices);

        let strengths = {
            let mut engine = self.engine.lock();
            engine.update_prices(&filled);
            engine.calculate_strengths()
        };

        let stored = self.store.lock().add_prices(prices, at);

        let deltas = {
            let mut state = self.state.lock();
            let deltas = prices
                .iter()
                .filter(|(_, price)| is_valid_price(**price))
                .filter_map(|(pair, price)| {
                    let previous = state.last_prices.get(pair).copied()?;
                    is_valid_price(previous).then(|| (*pair, price - previous))
                })
                .collect::<BTreeMap<_, _>>();

            state.last_prices = prices.clone();
            state.pushes += 1;
            state.last_strengths = Some(StrengthUpdate::realtime(strengths, at));
            deltas
        };

        info!(
            at,
            received = prices.len(),
            updated = filled.len(),
            stored,
            "prices received={} updated={}",
            prices.len(),
            filled.len()
        );

        IngestReport {
            at,
            received: prices.len(),
            updated: filled.len(),
            deltas,
            strengths,
        }
    }

    /// Periodic recomputation at `now` (epoch milliseconds).
    ///
    /// Real-time strengths are always recomputed. The dashboard is recomputed when a
    /// push arrived since its last computation, and emitted once the emit interval
    /// has elapsed since the previous emission.
    pub fn tick(&self, now: i64) -> Tick {
        let strengths = StrengthUpdate::realtime(self.engine.lock().calculate_strengths(), now);

        let (pushes, stale) = {
            let state = self.state.lock();
            (state.pushes, state.pushes != state.dashboard_pushes)
        };

        let recomputed = if stale {
            let snapshot = self.dashboard.calculate_all(&self.store.lock(), None);
            debug!(pushes, at = ?snapshot.as_ref().map(|s| s.at), "recomputed dashboard");
            Some(snapshot)
        } else {
            None
        };

        let mut state = self.state.lock();
        state.last_strengths = Some(strengths.clone());

        if let Some(snapshot) = recomputed {
            state.dashboard_pushes = pushes;
            if snapshot.is_some() {
                state.last_dashboard = snapshot;
            }
        }

        let due = state
            .last_dashboard_emit
            .is_none_or(|last| now - last > self.dashboard_emit_interval_ms);

        let dashboard = match (&state.last_dashboard, due) {
            (Some(snapshot), true) => Some(snapshot.clone()),
            _ => None,
        };
        if dashboard.is_some() {
            state.last_dashboard_emit = Some(now);
        }

        Tick {
            strengths,
            dashboard,
        }
    }

    /// Most recent real-time scores, computing them at `now` when none exist yet.
    pub fn latest_strengths(&self, now: i64) -> StrengthUpdate {
        if let Some(update) = self.state.lock().last_strengths.clone() {
            return update;
        }

        let update = StrengthUpdate::realtime(self.engine.lock().calculate_strengths(), now);
        self.state.lock().last_strengths = Some(update.clone());
        update
    }

    /// Most recent dashboard, computing one from the store when none is cached.
    pub fn latest_dashboard(&self) -> Option<DashboardSnapshot> {
        if let Some(snapshot) = self.state.lock().last_dashboard.clone() {
            return Some(snapshot);
        }
        self.dashboard.calculate_all(&self.store.lock(), None)
    }

    /// Pair-move heatmap at `at`, defaulting to the latest observation time.
    pub fn heatmap(&self, at: Option<i64>) -> Option<HeatmapSnapshot> {
        self.dashboard.heatmap(&self.store.lock(), at)
    }

    /// Run `f` against the history store while holding its lock.
    pub fn with_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PriceHistoryStore) -> R,
    {
        f(&self.store.lock())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
