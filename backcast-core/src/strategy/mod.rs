//! Strategy capability set and the name-keyed dispatch table.
//!
//! A strategy precomputes its indicators in `initialize` and answers
//! `generate_signal(i)` from bars `[0..=i]` only — truncating the series
//! at `i` must never change the signal at `i`.

pub mod ma_crossover;
pub mod rsi_reversion;

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::data::MarketSeries;
use crate::error::BacktestError;

pub use ma_crossover::MaCrossover;
pub use rsi_reversion::RsiMeanReversion;

/// Discrete strategy output for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    Buy,
    Sell,
}

/// A trading strategy over a loaded series.
///
/// `initialize` is idempotent and may be called again after
/// `update_parameters` (parameter updates never recompute indicators on
/// their own).
pub trait Strategy: Send + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Typed schema of the accepted parameters.
    fn param_specs(&self) -> Vec<ParamSpec>;

    /// Apply a parameter map. Unknown keys are ignored; invalid values
    /// are rejected and leave the configuration unchanged.
    fn update_parameters(&mut self, params: &HashMap<String, f64>) -> Result<(), StrategyError>;

    /// Precompute indicators for the series.
    fn initialize(&mut self, series: &MarketSeries) -> Result<(), StrategyError>;

    /// Signal for the bar at `index`. Returns `Signal::None` whenever the
    /// indicators are not ready at that index.
    fn generate_signal(&self, index: usize) -> Signal;
}

/// Schema entry for one strategy parameter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Float,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("series has {have} bars, strategy needs at least {needed}")]
    InsufficientData { needed: usize, have: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<StrategyError> for BacktestError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::InsufficientData { .. } => BacktestError::InsufficientData(e.to_string()),
            StrategyError::InvalidParameter(_) => BacktestError::InvalidRequest(e.to_string()),
        }
    }
}

/// Dispatch table from public strategy name to constructor.
pub struct StrategyRegistry {
    builders: Vec<(&'static str, fn() -> Box<dyn Strategy>)>,
}

impl StrategyRegistry {
    /// Registry with the two reference strategies.
    pub fn new() -> Self {
        Self {
            builders: vec![
                (ma_crossover::NAME, || Box::new(MaCrossover::new()) as Box<dyn Strategy>),
                (rsi_reversion::NAME, || Box::new(RsiMeanReversion::new()) as Box<dyn Strategy>),
            ],
        }
    }

    /// Instantiate a strategy with default parameters.
    pub fn create(&self, name: &str) -> Result<Box<dyn Strategy>, BacktestError> {
        self.builders
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, build)| build())
            .ok_or_else(|| BacktestError::UnknownStrategy(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.iter().any(|(n, _)| *n == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.builders.iter().map(|(n, _)| *n).collect()
    }

    /// (name, description) for every registered strategy.
    pub fn descriptions(&self) -> Vec<(&'static str, &'static str)> {
        self.builders
            .iter()
            .map(|(_, build)| {
                let s = build();
                (s.name(), s.description())
            })
            .collect()
    }

    /// Parameter schema for a strategy, by name.
    pub fn param_specs(&self, name: &str) -> Result<Vec<ParamSpec>, BacktestError> {
        Ok(self.create(name)?.param_specs())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Integral parameter helper: rejects non-integers and values below `min`.
pub(crate) fn integer_param(name: &str, value: f64, min: usize) -> Result<usize, StrategyError> {
    if !value.is_finite() || value.fract() != 0.0 || value < min as f64 {
        return Err(StrategyError::InvalidParameter(format!(
            "{name} must be an integer >= {min}, got {value}"
        )));
    }
    Ok(value as usize)
}
