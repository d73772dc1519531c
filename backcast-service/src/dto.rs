//! Transport DTOs.
//!
//! Timestamps cross the boundary as milliseconds since the epoch; inside
//! the engine they stay `DateTime<Utc>`.

use std::collections::HashMap;

use backcast_core::domain::TradeSide;
use backcast_core::BacktestRun;
use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// A backtest submission. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestRequest {
    pub data_path: String,
    pub strategy_name: String,
    #[serde(default)]
    pub strategy_params: HashMap<String, f64>,
    pub initial_cash: f64,
    /// Server-assigned when empty.
    #[serde(default)]
    pub job_id: String,
}

/// Result DTO: derived metrics, trade log, equity curve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BacktestResults {
    pub job_id: String,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPointRecord>,
}

impl BacktestResults {
    /// Convert a finished kernel run into the wire shape.
    pub fn from_run(job_id: impl Into<String>, run: &BacktestRun) -> Self {
        Self {
            job_id: job_id.into(),
            total_return: run.total_return,
            sharpe_ratio: run.sharpe_ratio,
            max_drawdown: run.max_drawdown,
            win_rate: run.win_rate,
            trades: run
                .trades
                .iter()
                .map(|t| TradeRecord {
                    symbol: t.symbol.clone(),
                    side: t.side,
                    quantity: t.quantity,
                    price: t.price,
                    timestamp: t.timestamp.timestamp_millis(),
                })
                .collect(),
            equity_curve: run
                .equity_curve
                .iter()
                .map(|p| EquityPointRecord {
                    timestamp: p.timestamp.timestamp_millis(),
                    value: p.value,
                })
                .collect(),
        }
    }

    /// Empty sentinel returned for jobs that have not completed.
    pub fn empty(job_id: impl Into<String>) -> Self {
        Self { job_id: job_id.into(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityPointRecord {
    pub timestamp: i64,
    pub value: f64,
}

/// Status DTO snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub message: String,
    pub start_time_ms: i64,
    pub estimated_completion_ms: i64,
}
