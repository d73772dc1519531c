//! Lookahead freedom: a strategy's signal at bar `i` may depend only on
//! bars `[0..=i]`. Truncating the series right after `i` must reproduce
//! the exact signal at `i`.

use std::collections::HashMap;

use backcast_core::data::MarketSeries;
use backcast_core::domain::Bar;
use backcast_core::strategy::{Strategy, StrategyRegistry};
use chrono::{TimeZone, Utc};

fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.01),
            close,
            volume: 1000,
        })
        .collect()
}

/// Deterministic wiggly walk, enough movement to trigger both strategies.
fn walk(n: usize) -> Vec<f64> {
    let mut closes = Vec::with_capacity(n);
    let mut price = 100.0f64;
    for i in 0..n {
        let step = (((i * 31 + 7) % 13) as f64) - 6.0;
        price = (price + step).max(1.0);
        closes.push(price);
    }
    closes
}

fn configured(name: &str, params: &HashMap<String, f64>) -> Box<dyn Strategy> {
    let registry = StrategyRegistry::new();
    let mut s = registry.create(name).unwrap();
    s.update_parameters(params).unwrap();
    s
}

fn assert_no_lookahead(name: &str, params: &HashMap<String, f64>, min_len: usize) {
    let closes = walk(120);
    let full_series = MarketSeries::new(make_bars(&closes));
    let mut full = configured(name, params);
    full.initialize(&full_series).unwrap();

    for i in min_len..closes.len() {
        let truncated_series = MarketSeries::new(make_bars(&closes[..=i]));
        let mut truncated = configured(name, params);
        truncated.initialize(&truncated_series).unwrap();

        assert_eq!(
            full.generate_signal(i),
            truncated.generate_signal(i),
            "{name}: signal at bar {i} changed when future bars were removed"
        );
    }
}

#[test]
fn ma_crossover_is_lookahead_free() {
    let params = HashMap::from([
        ("shortPeriod".to_string(), 5.0),
        ("longPeriod".to_string(), 15.0),
    ]);
    assert_no_lookahead("Moving Average Crossover", &params, 15);
}

#[test]
fn rsi_mean_reversion_is_lookahead_free() {
    let params = HashMap::from([
        ("period".to_string(), 7.0),
        ("oversoldThreshold".to_string(), 35.0),
        ("overboughtThreshold".to_string(), 65.0),
    ]);
    assert_no_lookahead("RSI Mean Reversion", &params, 8);
}
