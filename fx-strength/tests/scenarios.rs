use fx_strength::{
    Currency, DashboardEngine, PAIRS, Pair, PriceHistoryStore, PriceMap, StrengthConfig,
    StrengthEngine, StrengthService, Timeframe, USD_MAJORS, fill_missing_pairs,
    triangulate::rate,
};

const T0: i64 = 1_700_000_000_000;
const MINUTE_MS: i64 = 60_000;

fn pair(symbol: &str) -> Pair {
    symbol.parse().unwrap()
}

fn majors(shift: f64) -> PriceMap {
    PriceMap::from_iter([
        (pair("EURUSD"), 1.0850 * (1.0 + shift)),
        (pair("GBPUSD"), 1.2700 * (1.0 - shift / 2.0)),
        (pair("AUDUSD"), 0.6550 * (1.0 + shift / 3.0)),
        (pair("NZDUSD"), 0.6000),
        (pair("USDJPY"), 150.00 * (1.0 + shift)),
        (pair("USDCHF"), 0.8800 * (1.0 - shift)),
        (pair("USDCAD"), 1.3600),
    ])
}

/// Deterministic wobble in roughly [-1%, 1%].
fn wobble(step: usize) -> f64 {
    ((step as f64) * 0.7).sin() * 0.01
}

#[test]
fn test_triangulate_eurusd_and_usdjpy_only() {
    let input = PriceMap::from_iter([(pair("EURUSD"), 1.1000), (pair("USDJPY"), 110.00)]);
    let filled = fill_missing_pairs(&input);

    let eurjpy = filled.get(&pair("EURJPY")).copied().unwrap();
    assert!((eurjpy - 121.0).abs() < 1e-9);

    let jpyusd = rate(&filled, Currency::Jpy, Currency::Usd).unwrap();
    assert!((jpyusd - 1.0 / 110.0).abs() < 1e-12);

    let unresolved = [
        Currency::Gbp,
        Currency::Chf,
        Currency::Aud,
        Currency::Cad,
        Currency::Nzd,
    ];
    for pair in PAIRS {
        let expected = !unresolved.iter().any(|currency| pair.involves(*currency));
        assert_eq!(filled.contains_key(&pair), expected, "{pair} failed");
    }
}

#[test]
fn test_triangulation_properties() {
    for step in 0..20 {
        let input = majors(wobble(step));
        let once = fill_missing_pairs(&input);
        assert_eq!(fill_missing_pairs(&once), once);

        let audjpy = once.get(&pair("AUDJPY")).copied().unwrap();
        let expected = input[&pair("AUDUSD")] * input[&pair("USDJPY")];
        assert!((audjpy - expected).abs() < 1e-9 * expected);
    }

    for pair in PAIRS {
        let p = 1.2345;
        let filled = fill_missing_pairs(&PriceMap::from_iter([(pair, p)]));
        let inverse = rate(&filled, pair.quote(), pair.base()).unwrap();
        assert!((inverse - 1.0 / p).abs() < 1e-12, "{pair} failed");
    }
}

#[test]
fn test_constant_prices_converge_to_neutral() {
    let config = StrengthConfig::default();
    let service = StrengthService::new(config.clone());

    // Some movement first so the scores leave the midpoint.
    for step in 0..10 {
        service.ingest(&majors(wobble(step)), Some(T0 + step as i64 * MINUTE_MS));
    }
    let moving = service.tick(T0 + 10 * MINUTE_MS);
    assert!(moving.strengths.strengths.values().any(|s| *s != 5.0));

    let constant = majors(0.0);
    for step in 0..=config.lookback_samples as i64 + 1 {
        service.ingest(&constant, Some(T0 + (11 + step) * MINUTE_MS));
    }

    let settled = service.tick(T0 + 30 * MINUTE_MS);
    assert!(settled.strengths.strengths.values().all(|s| *s == 5.0));
}

#[test]
fn test_realtime_scores_stay_in_range() {
    let mut engine = StrengthEngine::default();

    for step in 0..100 {
        engine.update_prices(&fill_missing_pairs(&majors(wobble(step) * 3.0)));
        let strengths = engine.calculate_strengths();
        assert!(strengths.values().all(|s| (0.0..=10.0).contains(s)), "step {step} failed");
    }
}

#[test]
fn test_dashboard_scores_stay_in_range() {
    let mut store = PriceHistoryStore::default();
    let engine = DashboardEngine::default();

    for step in 0..120 {
        store.add_prices(&majors(wobble(step)), T0 + step as i64 * MINUTE_MS);
    }

    let snapshot = engine.calculate_all(&store, None).unwrap();
    let satisfied = snapshot.scores_by_tf.values().flatten().collect::<Vec<_>>();
    assert!(!satisfied.is_empty());

    for scores in satisfied {
        assert!(scores.values().all(|s| *s <= 100));
        assert_eq!(scores.values().max(), Some(&100));
        assert_eq!(scores.values().min(), Some(&0));
    }
}

#[test]
fn test_identical_contributions_are_neutral() {
    let mut store = PriceHistoryStore::default();
    let dashboard = DashboardEngine::default();
    let mut engine = StrengthEngine::default();

    for step in 0..3 {
        store.add_prices(&majors(0.0), T0 + step * 5 * MINUTE_MS);
        engine.update_prices(&fill_missing_pairs(&majors(0.0)));
    }

    assert!(engine.calculate_strengths().values().all(|s| *s == 5.0));

    let scores = dashboard
        .calculate_window(&store, T0 + 10 * MINUTE_MS, T0)
        .unwrap();
    assert!(scores.values().all(|s| *s == 50));
}

#[test]
fn test_dashboard_timeframe_missing_majors() {
    let mut store = PriceHistoryStore::default();
    let engine = DashboardEngine::default();

    // Only EURUSD and USDJPY were quoted two hours back.
    let early = majors(0.0)
        .into_iter()
        .filter(|(pair, _)| pair.involves(Currency::Eur) || pair.involves(Currency::Jpy))
        .collect::<PriceMap>();
    assert!(early.len() < USD_MAJORS.len());

    store.add_prices(&early, T0 - 2 * 60 * MINUTE_MS);
    store.add_prices(&majors(0.001), T0 - 30 * MINUTE_MS);
    store.add_prices(&majors(0.002), T0);

    let snapshot = engine.calculate_all(&store, Some(T0)).unwrap();

    for timeframe in [Timeframe::M5, Timeframe::M15, Timeframe::M30] {
        assert!(snapshot.scores_by_tf[&timeframe].is_some(), "{timeframe} failed");
    }
    for timeframe in [Timeframe::H1, Timeframe::H4, Timeframe::H24, Timeframe::W1] {
        assert!(snapshot.scores_by_tf[&timeframe].is_none(), "{timeframe} failed");
    }
}

#[test]
fn test_store_lookup_and_eviction() {
    let capacity = 50;
    let extra = 5;
    let mut store = PriceHistoryStore::new(capacity);
    let eurusd = pair("EURUSD");

    for step in 0..(capacity + extra) as i64 {
        store.add_prices(
            &PriceMap::from_iter([(eurusd, 1.1 + step as f64 * 1e-4)]),
            T0 + step * MINUTE_MS,
        );
    }

    assert_eq!(store.len(&eurusd), capacity);

    let first = store.first(&eurusd).unwrap();
    assert_eq!(first.time, T0 + extra as i64 * MINUTE_MS);
    assert_eq!(store.price_at_or_before(&eurusd, first.time - 1), None);
    assert_eq!(store.price_at_or_before(&eurusd, first.time), Some(first));

    let last_time = T0 + (capacity + extra - 1) as i64 * MINUTE_MS;
    let last = store.price_at_or_before(&eurusd, last_time).unwrap();
    assert_eq!(last.time, last_time);
    assert_eq!(store.price_at_or_before(&eurusd, last_time + 10 * MINUTE_MS), Some(last));
}
