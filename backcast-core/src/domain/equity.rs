use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point of the equity curve: total portfolio value at a bar close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}
