//! Moving-average crossover strategy.
//!
//! Buys on a bullish crossover (short SMA crosses above long SMA) and
//! sells on a bearish one. Equal SMAs on either bar suppress the signal.

use std::collections::HashMap;

use crate::data::MarketSeries;
use crate::indicators::sma;
use crate::strategy::{integer_param, ParamKind, ParamSpec, Signal, Strategy, StrategyError};

pub const NAME: &str = "Moving Average Crossover";

const DEFAULT_SHORT_PERIOD: usize = 10;
const DEFAULT_LONG_PERIOD: usize = 30;

#[derive(Debug, Clone)]
pub struct MaCrossover {
    short_period: usize,
    long_period: usize,
    short_ma: Vec<f64>,
    long_ma: Vec<f64>,
}

impl MaCrossover {
    pub fn new() -> Self {
        Self {
            short_period: DEFAULT_SHORT_PERIOD,
            long_period: DEFAULT_LONG_PERIOD,
            short_ma: Vec::new(),
            long_ma: Vec::new(),
        }
    }
}

impl Default for MaCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Trades crossovers of a short and a long simple moving average of the close"
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec {
                name: "shortPeriod",
                kind: ParamKind::Integer,
                default: DEFAULT_SHORT_PERIOD as f64,
                min: 1.0,
                max: 500.0,
                description: "Window of the short moving average, in bars",
            },
            ParamSpec {
                name: "longPeriod",
                kind: ParamKind::Integer,
                default: DEFAULT_LONG_PERIOD as f64,
                min: 2.0,
                max: 1000.0,
                description: "Window of the long moving average, in bars; must exceed shortPeriod",
            },
        ]
    }

    fn update_parameters(&mut self, params: &HashMap<String, f64>) -> Result<(), StrategyError> {
        let mut short = self.short_period;
        let mut long = self.long_period;

        if let Some(&value) = params.get("shortPeriod") {
            short = integer_param("shortPeriod", value, 1)?;
        }
        if let Some(&value) = params.get("longPeriod") {
            long = integer_param("longPeriod", value, 2)?;
        }
        if short >= long {
            return Err(StrategyError::InvalidParameter(format!(
                "shortPeriod ({short}) must be less than longPeriod ({long})"
            )));
        }

        self.short_period = short;
        self.long_period = long;
        // Stale until the caller re-initializes.
        self.short_ma.clear();
        self.long_ma.clear();
        Ok(())
    }

    fn initialize(&mut self, series: &MarketSeries) -> Result<(), StrategyError> {
        if series.len() < self.long_period {
            return Err(StrategyError::InsufficientData {
                needed: self.long_period,
                have: series.len(),
            });
        }
        self.short_ma = sma(series.bars(), self.short_period);
        self.long_ma = sma(series.bars(), self.long_period);
        Ok(())
    }

    fn generate_signal(&self, index: usize) -> Signal {
        if index < self.long_period || index >= self.short_ma.len() {
            return Signal::None;
        }

        let short_prev = self.short_ma[index - 1];
        let long_prev = self.long_ma[index - 1];
        let short_cur = self.short_ma[index];
        let long_cur = self.long_ma[index];
        if short_prev.is_nan() || long_prev.is_nan() || short_cur.is_nan() || long_cur.is_nan() {
            return Signal::None;
        }

        if short_prev < long_prev && short_cur > long_cur {
            return Signal::Buy;
        }
        if short_prev > long_prev && short_cur < long_cur {
            return Signal::Sell;
        }
        Signal::None
    }
}
