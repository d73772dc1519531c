//! Engine-level error taxonomy.
//!
//! Every failure a backtest can surface maps to one of these variants. The
//! job layer stores `code()` + message in the failed job's record.

use thiserror::Error;

use crate::domain::PortfolioError;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BacktestError {
    /// Stable wire code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BacktestError::InvalidRequest(_) => "INVALID_REQUEST",
            BacktestError::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            BacktestError::InsufficientData(_) => "INSUFFICIENT_DATA",
            BacktestError::Io(_) => "IO_ERROR",
            BacktestError::Parse(_) => "PARSE_ERROR",
            BacktestError::Portfolio(PortfolioError::InsufficientCash { .. }) => {
                "INSUFFICIENT_CASH"
            }
            BacktestError::Portfolio(PortfolioError::InsufficientPosition { .. }) => {
                "INSUFFICIENT_POSITION"
            }
            BacktestError::Internal(_) => "INTERNAL",
        }
    }
}
