use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Executed trade record. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        symbol: impl Into<String>,
        side: TradeSide,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { symbol: symbol.into(), side, quantity, price, timestamp }
    }

    /// Notional value of the trade.
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }
}
