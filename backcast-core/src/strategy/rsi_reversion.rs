//! RSI mean-reversion strategy.
//!
//! Buys when the RSI is at or below the oversold threshold, sells when it
//! is at or above the overbought threshold.

use std::collections::HashMap;

use crate::data::MarketSeries;
use crate::indicators::rsi;
use crate::strategy::{integer_param, ParamKind, ParamSpec, Signal, Strategy, StrategyError};

pub const NAME: &str = "RSI Mean Reversion";

const DEFAULT_PERIOD: usize = 14;
const DEFAULT_OVERSOLD: f64 = 30.0;
const DEFAULT_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone)]
pub struct RsiMeanReversion {
    period: usize,
    oversold: f64,
    overbought: f64,
    rsi_values: Vec<f64>,
}

impl RsiMeanReversion {
    pub fn new() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
            rsi_values: Vec::new(),
        }
    }
}

impl Default for RsiMeanReversion {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RsiMeanReversion {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Fades extremes of the Relative Strength Index back toward the mean"
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec {
                name: "period",
                kind: ParamKind::Integer,
                default: DEFAULT_PERIOD as f64,
                min: 1.0,
                max: 500.0,
                description: "RSI lookback window, in bars",
            },
            ParamSpec {
                name: "oversoldThreshold",
                kind: ParamKind::Float,
                default: DEFAULT_OVERSOLD,
                min: 0.0,
                max: 100.0,
                description: "RSI at or below this level triggers a buy",
            },
            ParamSpec {
                name: "overboughtThreshold",
                kind: ParamKind::Float,
                default: DEFAULT_OVERBOUGHT,
                min: 0.0,
                max: 100.0,
                description: "RSI at or above this level triggers a sell",
            },
        ]
    }

    fn update_parameters(&mut self, params: &HashMap<String, f64>) -> Result<(), StrategyError> {
        let mut period = self.period;
        let mut oversold = self.oversold;
        let mut overbought = self.overbought;

        if let Some(&value) = params.get("period") {
            period = integer_param("period", value, 1)?;
        }
        if let Some(&value) = params.get("oversoldThreshold") {
            oversold = value;
        }
        if let Some(&value) = params.get("overboughtThreshold") {
            overbought = value;
        }
        if !(oversold.is_finite() && overbought.is_finite())
            || oversold <= 0.0
            || oversold >= overbought
            || overbought >= 100.0
        {
            return Err(StrategyError::InvalidParameter(format!(
                "thresholds must satisfy 0 < oversold < overbought < 100, \
                 got oversold={oversold}, overbought={overbought}"
            )));
        }

        self.period = period;
        self.oversold = oversold;
        self.overbought = overbought;
        self.rsi_values.clear();
        Ok(())
    }

    fn initialize(&mut self, series: &MarketSeries) -> Result<(), StrategyError> {
        // First defined RSI is at index `period`, which needs period+1 bars.
        if series.len() < self.period + 1 {
            return Err(StrategyError::InsufficientData {
                needed: self.period + 1,
                have: series.len(),
            });
        }
        self.rsi_values = rsi(series.bars(), self.period);
        Ok(())
    }

    fn generate_signal(&self, index: usize) -> Signal {
        if index < self.period || index >= self.rsi_values.len() {
            return Signal::None;
        }
        let value = self.rsi_values[index];
        if value.is_nan() {
            return Signal::None;
        }
        if value <= self.oversold {
            Signal::Buy
        } else if value >= self.overbought {
            Signal::Sell
        } else {
            Signal::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn configured(period: usize, oversold: f64, overbought: f64) -> RsiMeanReversion {
        let mut s = RsiMeanReversion::new();
        let params = HashMap::from([
            ("period".to_string(), period as f64),
            ("oversoldThreshold".to_string(), oversold),
            ("overboughtThreshold".to_string(), overbought),
        ]);
        s.update_parameters(&params).unwrap();
        s
    }

    #[test]
    fn constant_closes_pin_rsi_at_100_and_sell() {
        // Zero movement means avg loss = 0 and RSI = 100 at every ready
        // index, so the strategy signals sell continuously.
        let series = MarketSeries::new(make_bars(&[5.0; 20]));
        let mut s = RsiMeanReversion::new();
        s.initialize(&series).unwrap();
        for i in 0..14 {
            assert_eq!(s.generate_signal(i), Signal::None);
        }
        for i in 14..20 {
            assert_eq!(s.generate_signal(i), Signal::Sell);
        }
    }

    #[test]
    fn steady_decline_is_oversold() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let series = MarketSeries::new(make_bars(&closes));
        let mut s = configured(3, 30.0, 70.0);
        s.initialize(&series).unwrap();
        // All losses: RSI = 0 everywhere after warmup.
        for i in 3..10 {
            assert_eq!(s.generate_signal(i), Signal::Buy);
        }
    }

    #[test]
    fn neutral_rsi_is_silent() {
        // Alternating equal-sized moves keep RSI near 50.
        let closes: Vec<f64> = (0..12)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let series = MarketSeries::new(make_bars(&closes));
        let mut s = configured(4, 30.0, 70.0);
        s.initialize(&series).unwrap();
        for i in 4..12 {
            assert_eq!(s.generate_signal(i), Signal::None);
        }
    }

    #[test]
    fn short_series_fails_initialize() {
        let series = MarketSeries::new(make_bars(&[5.0; 10]));
        let mut s = RsiMeanReversion::new();
        let err = s.initialize(&series).unwrap_err();
        assert!(matches!(err, StrategyError::InsufficientData { needed: 15, have: 10 }));
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let mut s = RsiMeanReversion::new();
        let params = HashMap::from([
            ("oversoldThreshold".to_string(), 70.0),
            ("overboughtThreshold".to_string(), 30.0),
        ]);
        assert!(s.update_parameters(&params).is_err());
    }

    #[test]
    fn rejects_thresholds_outside_bounds() {
        let mut s = RsiMeanReversion::new();
        assert!(s
            .update_parameters(&HashMap::from([("oversoldThreshold".to_string(), 0.0)]))
            .is_err());
        assert!(s
            .update_parameters(&HashMap::from([("overboughtThreshold".to_string(), 100.0)]))
            .is_err());
    }

    #[test]
    fn initialize_is_idempotent() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let series = MarketSeries::new(make_bars(&closes));
        let mut s = configured(3, 30.0, 70.0);
        s.initialize(&series).unwrap();
        let first: Vec<Signal> = (0..10).map(|i| s.generate_signal(i)).collect();
        s.initialize(&series).unwrap();
        let second: Vec<Signal> = (0..10).map(|i| s.generate_signal(i)).collect();
        assert_eq!(first, second);
    }
}
