//! Performance metrics over an equity curve and a trade log.
//!
//! All metrics are total functions: degenerate inputs (empty curves, zero
//! starting equity, no completed trade pairs) yield 0.

use std::collections::HashMap;

use crate::domain::{EquityPoint, Trade, TradeSide};

/// Trading days per year, used to annualize the Sharpe ratio.
const ANNUALIZATION_FACTOR: f64 = 252.0;

/// Fractional gain of the curve end over its start.
pub fn total_return(equity_curve: &[EquityPoint]) -> f64 {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if first.value == 0.0 {
        return 0.0;
    }
    (last.value - first.value) / first.value
}

/// Largest fractional decline from a running peak. Always in [0, 1] for
/// non-negative equity.
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.value;
    let mut max_dd: f64 = 0.0;
    for point in equity_curve {
        if point.value > peak {
            peak = point.value;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.value) / peak);
        }
    }
    max_dd
}

/// Annualized Sharpe ratio of per-bar returns.
///
/// Uses the population standard deviation and a 252-bar year.
/// `risk_free_rate` is annualized; 0 when returns are empty or flat.
pub fn sharpe_ratio(equity_curve: &[EquityPoint], risk_free_rate: f64) -> f64 {
    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].value != 0.0)
        .map(|w| (w[1].value - w[0].value) / w[0].value)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();

    let annualized_std = std_dev * ANNUALIZATION_FACTOR.sqrt();
    if annualized_std == 0.0 {
        return 0.0;
    }
    (mean * ANNUALIZATION_FACTOR - risk_free_rate) / annualized_std
}

/// Fraction of completed buy/sell pairs that closed at a profit.
///
/// A BUY opens a slot for its symbol; the next SELL of that symbol closes
/// it, profitably iff the sell price exceeds the buy price. Unmatched
/// trades do not count; 0 when no pair completed.
pub fn win_rate(trades: &[Trade]) -> f64 {
    let mut open_buys: HashMap<&str, f64> = HashMap::new();
    let mut completed = 0usize;
    let mut profitable = 0usize;

    for trade in trades {
        match trade.side {
            TradeSide::Buy => {
                open_buys.insert(trade.symbol.as_str(), trade.price);
            }
            TradeSide::Sell => {
                if let Some(buy_price) = open_buys.remove(trade.symbol.as_str()) {
                    completed += 1;
                    if trade.price > buy_price {
                        profitable += 1;
                    }
                }
            }
        }
    }

    if completed == 0 {
        return 0.0;
    }
    profitable as f64 / completed as f64
}
