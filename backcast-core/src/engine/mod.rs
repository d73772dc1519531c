//! Deterministic market-replay kernel.
//!
//! Fixed per-bar policy: ask the strategy, execute at the bar close
//! (all-in when flat on BUY, full exit on SELL), then mark to market.
//! Single instrument, no fees, no slippage, one position at a time.

use std::collections::HashMap;

use tracing::debug;

use crate::data::{load_csv, MarketSeries};
use crate::domain::{EquityPoint, Portfolio, Trade, TradeSide};
use crate::error::BacktestError;
use crate::metrics;
use crate::strategy::{Signal, Strategy, StrategyRegistry};

/// The single instrument symbol every backtest trades.
pub const DEFAULT_SYMBOL: &str = "DEFAULT";

const DEFAULT_RISK_FREE_RATE: f64 = 0.0;

/// Number of progress milestones across the bar loop.
const PROGRESS_MILESTONES: usize = 10;

/// Completed backtest: derived metrics plus the raw trade log and curve.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Progress observer: fraction of bars replayed in [0, 1] plus a step label.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64, &str);

/// Entry point for a full backtest: load, configure, replay, measure.
pub struct BacktestEngine {
    registry: StrategyRegistry,
}

impl BacktestEngine {
    pub fn new() -> Self {
        Self { registry: StrategyRegistry::new() }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Run one backtest end to end.
    ///
    /// `progress` is invoked with a loading step first, then at bar-count
    /// milestones (approximately every 10% of the series).
    pub fn run(
        &self,
        data_path: &str,
        strategy_name: &str,
        params: &HashMap<String, f64>,
        initial_cash: f64,
        progress: ProgressFn<'_>,
    ) -> Result<BacktestRun, BacktestError> {
        if !initial_cash.is_finite() || initial_cash <= 0.0 {
            return Err(BacktestError::InvalidRequest(format!(
                "initial_cash must be positive, got {initial_cash}"
            )));
        }

        progress(0.0, "Loading market data");
        let series = load_csv(data_path)?;

        let mut strategy = self.registry.create(strategy_name)?;
        strategy.update_parameters(params)?;
        strategy.initialize(&series)?;

        replay(&series, strategy.as_mut(), initial_cash, progress)
    }
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay an initialized strategy over a loaded series.
pub fn replay(
    series: &MarketSeries,
    strategy: &mut dyn Strategy,
    initial_cash: f64,
    progress: ProgressFn<'_>,
) -> Result<BacktestRun, BacktestError> {
    let bars = series.bars();
    let mut portfolio = Portfolio::new(initial_cash);
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut prices = HashMap::with_capacity(1);

    let milestone = (bars.len() / PROGRESS_MILESTONES).max(1);

    for (i, bar) in bars.iter().enumerate() {
        match strategy.generate_signal(i) {
            Signal::Buy if portfolio.position(DEFAULT_SYMBOL) == 0.0 => {
                let quantity = (portfolio.cash() / bar.close).floor();
                if quantity >= 1.0 {
                    portfolio.apply(Trade::new(
                        DEFAULT_SYMBOL,
                        TradeSide::Buy,
                        quantity,
                        bar.close,
                        bar.timestamp,
                    ))?;
                }
            }
            Signal::Sell if portfolio.position(DEFAULT_SYMBOL) > 0.0 => {
                let quantity = portfolio.position(DEFAULT_SYMBOL);
                portfolio.apply(Trade::new(
                    DEFAULT_SYMBOL,
                    TradeSide::Sell,
                    quantity,
                    bar.close,
                    bar.timestamp,
                ))?;
            }
            _ => {}
        }

        prices.insert(DEFAULT_SYMBOL.to_string(), bar.close);
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            value: portfolio.total_value(&prices),
        });

        let done = i + 1;
        if done % milestone == 0 || done == bars.len() {
            progress(
                done as f64 / bars.len() as f64,
                &format!("Replayed {done}/{} bars", bars.len()),
            );
        }
    }

    let trades = portfolio.into_trades();
    debug!(bars = bars.len(), trades = trades.len(), "replay finished");

    Ok(BacktestRun {
        total_return: metrics::total_return(&equity_curve),
        sharpe_ratio: metrics::sharpe_ratio(&equity_curve, DEFAULT_RISK_FREE_RATE),
        max_drawdown: metrics::max_drawdown(&equity_curve),
        win_rate: metrics::win_rate(&trades),
        trades,
        equity_curve,
    })
}
