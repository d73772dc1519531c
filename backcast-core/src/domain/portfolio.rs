use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::trade::{Trade, TradeSide};

/// Cash + positions ledger.
///
/// Invariants held after every applied trade: cash is non-negative, every
/// position is non-negative, and the trade list is append-only in
/// timestamp order (the kernel replays bars in order, so appends are
/// naturally monotone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    positions: HashMap<String, f64>,
    trades: Vec<Trade>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self { cash: initial_cash, positions: HashMap::new(), trades: Vec::new() }
    }

    /// Apply a trade, debiting or crediting cash and the position.
    ///
    /// A rejected trade leaves the ledger untouched.
    pub fn apply(&mut self, trade: Trade) -> Result<(), PortfolioError> {
        let value = trade.value();
        match trade.side {
            TradeSide::Buy => {
                if self.cash < value {
                    return Err(PortfolioError::InsufficientCash {
                        needed: value,
                        available: self.cash,
                    });
                }
                self.cash -= value;
                *self.positions.entry(trade.symbol.clone()).or_insert(0.0) += trade.quantity;
            }
            TradeSide::Sell => {
                let held = self.position(&trade.symbol);
                if held < trade.quantity {
                    return Err(PortfolioError::InsufficientPosition {
                        symbol: trade.symbol.clone(),
                        needed: trade.quantity,
                        available: held,
                    });
                }
                self.cash += value;
                *self.positions.entry(trade.symbol.clone()).or_insert(0.0) -= trade.quantity;
            }
        }
        self.trades.push(trade);
        Ok(())
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Held quantity for a symbol; 0 when no position exists.
    pub fn position(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).copied().unwrap_or(0.0)
    }

    /// Market value of all positions at the given prices. Positions without
    /// a quoted price contribute nothing.
    pub fn equity_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.positions
            .iter()
            .map(|(symbol, qty)| qty * prices.get(symbol).copied().unwrap_or(0.0))
            .sum()
    }

    /// Cash plus position value.
    pub fn total_value(&self, prices: &HashMap<String, f64>) -> f64 {
        self.cash + self.equity_value(prices)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("insufficient cash: trade needs {needed:.2}, available {available:.2}")]
    InsufficientCash { needed: f64, available: f64 },

    #[error("insufficient position in {symbol}: sell of {needed} exceeds held {available}")]
    InsufficientPosition { symbol: String, needed: f64, available: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn buy(qty: f64, price: f64) -> Trade {
        Trade::new("DEFAULT", TradeSide::Buy, qty, price, Utc::now())
    }

    fn sell(qty: f64, price: f64) -> Trade {
        Trade::new("DEFAULT", TradeSide::Sell, qty, price, Utc::now())
    }

    #[test]
    fn buy_moves_cash_into_position() {
        let mut p = Portfolio::new(1000.0);
        p.apply(buy(90.0, 11.0)).unwrap();
        assert_eq!(p.cash(), 10.0);
        assert_eq!(p.position("DEFAULT"), 90.0);
        assert_eq!(p.trades().len(), 1);
    }

    #[test]
    fn sell_moves_position_into_cash() {
        let mut p = Portfolio::new(1000.0);
        p.apply(buy(90.0, 11.0)).unwrap();
        p.apply(sell(90.0, 13.0)).unwrap();
        assert_eq!(p.cash(), 10.0 + 90.0 * 13.0);
        assert_eq!(p.position("DEFAULT"), 0.0);
    }

    #[test]
    fn overdraft_is_rejected_without_side_effects() {
        let mut p = Portfolio::new(100.0);
        let err = p.apply(buy(20.0, 11.0)).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientCash { .. }));
        assert_eq!(p.cash(), 100.0);
        assert_eq!(p.position("DEFAULT"), 0.0);
        assert!(p.trades().is_empty());
    }

    #[test]
    fn oversell_is_rejected_without_side_effects() {
        let mut p = Portfolio::new(1000.0);
        p.apply(buy(10.0, 10.0)).unwrap();
        let err = p.apply(sell(11.0, 10.0)).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientPosition { .. }));
        assert_eq!(p.position("DEFAULT"), 10.0);
        assert_eq!(p.trades().len(), 1);
    }

    #[test]
    fn total_value_marks_to_market() {
        let mut p = Portfolio::new(1000.0);
        p.apply(buy(90.0, 11.0)).unwrap();
        let prices = HashMap::from([("DEFAULT".to_string(), 13.0)]);
        assert_eq!(p.equity_value(&prices), 90.0 * 13.0);
        assert_eq!(p.total_value(&prices), 10.0 + 90.0 * 13.0);
    }

    #[test]
    fn unquoted_symbol_contributes_nothing() {
        let mut p = Portfolio::new(1000.0);
        p.apply(buy(90.0, 11.0)).unwrap();
        assert_eq!(p.equity_value(&HashMap::new()), 0.0);
    }
}
