use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Single OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }

    /// Validate bar invariants: all prices finite and positive,
    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn validate(&self) -> Result<(), BarError> {
        for price in [self.open, self.high, self.low, self.close] {
            if !price.is_finite() || price <= 0.0 {
                return Err(BarError::NonPositivePrice(price));
            }
        }
        if self.high < self.low {
            return Err(BarError::InvalidRange { high: self.high, low: self.low });
        }
        if !(self.low..=self.high).contains(&self.open) {
            return Err(BarError::OpenOutOfRange);
        }
        if !(self.low..=self.high).contains(&self.close) {
            return Err(BarError::CloseOutOfRange);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BarError {
    #[error("Invalid bar range: high={high}, low={low}")]
    InvalidRange { high: f64, low: f64 },

    #[error("Price must be finite and positive, got {0}")]
    NonPositivePrice(f64),

    #[error("Open price outside high/low range")]
    OpenOutOfRange,

    #[error("Close price outside high/low range")]
    CloseOutOfRange,
}
