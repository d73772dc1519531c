//! Service facade: request validation mapped onto job-manager operations.
//!
//! Stateless over the manager; the dependency is strictly one-way.

use backcast_core::strategy::ParamSpec;
use backcast_core::BacktestError;
use serde::{Deserialize, Serialize};

use crate::dto::{BacktestRequest, BacktestResults, JobStatusResponse};
use crate::manager::JobManager;

/// Strategy listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
}

/// Outcome of a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

pub struct BacktestService<'a> {
    manager: &'a JobManager,
}

impl<'a> BacktestService<'a> {
    pub fn new(manager: &'a JobManager) -> Self {
        Self { manager }
    }

    /// Validate and enqueue a backtest. Returns the job id.
    pub fn submit_backtest(&self, request: BacktestRequest) -> Result<String, BacktestError> {
        if request.data_path.is_empty() {
            return Err(BacktestError::InvalidRequest("data_path must not be empty".into()));
        }
        if !request.initial_cash.is_finite() || request.initial_cash <= 0.0 {
            return Err(BacktestError::InvalidRequest(format!(
                "initial_cash must be positive, got {}",
                request.initial_cash
            )));
        }
        for (key, value) in &request.strategy_params {
            if !value.is_finite() {
                return Err(BacktestError::InvalidRequest(format!(
                    "parameter {key} must be finite, got {value}"
                )));
            }
        }
        if !self.manager.registry().contains(&request.strategy_name) {
            return Err(BacktestError::UnknownStrategy(request.strategy_name));
        }

        Ok(self.manager.submit(request))
    }

    pub fn get_job_status(&self, job_id: &str) -> JobStatusResponse {
        self.manager.get_status(job_id)
    }

    pub fn get_job_results(&self, job_id: &str) -> BacktestResults {
        self.manager.get_result(job_id)
    }

    pub fn cancel_job(&self, job_id: &str) -> CancelResponse {
        if self.manager.cancel(job_id) {
            CancelResponse {
                success: true,
                message: "Job cancelled".to_string(),
            }
        } else {
            CancelResponse {
                success: false,
                message: "Job is not pending and cannot be cancelled".to_string(),
            }
        }
    }

    /// Names and human descriptions of the registered strategies.
    pub fn list_strategies(&self) -> Vec<StrategyInfo> {
        self.manager
            .registry()
            .descriptions()
            .into_iter()
            .map(|(name, description)| StrategyInfo {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect()
    }

    /// Typed parameter schema for a strategy.
    pub fn get_strategy_parameters(&self, name: &str) -> Result<Vec<ParamSpec>, BacktestError> {
        self.manager.registry().param_specs(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request() -> BacktestRequest {
        BacktestRequest {
            data_path: "spy.csv".to_string(),
            strategy_name: "Moving Average Crossover".to_string(),
            strategy_params: HashMap::new(),
            initial_cash: 1000.0,
            job_id: String::new(),
        }
    }

    #[test]
    fn valid_request_is_accepted() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let id = service.submit_backtest(request()).unwrap();
        assert!(id.starts_with("job_"));
        assert_eq!(manager.queue_size(), 1);
    }

    #[test]
    fn empty_data_path_is_invalid() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let mut bad = request();
        bad.data_path.clear();
        assert_eq!(service.submit_backtest(bad).unwrap_err().code(), "INVALID_REQUEST");
    }

    #[test]
    fn non_positive_cash_is_invalid() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let mut bad = request();
        bad.initial_cash = -5.0;
        assert_eq!(service.submit_backtest(bad).unwrap_err().code(), "INVALID_REQUEST");
    }

    #[test]
    fn nan_parameter_is_invalid() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let mut bad = request();
        bad.strategy_params.insert("shortPeriod".to_string(), f64::NAN);
        assert_eq!(service.submit_backtest(bad).unwrap_err().code(), "INVALID_REQUEST");
    }

    #[test]
    fn unknown_strategy_is_rejected_before_enqueue() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let mut bad = request();
        bad.strategy_name = "Momentum Breakout".to_string();
        assert_eq!(service.submit_backtest(bad).unwrap_err().code(), "UNKNOWN_STRATEGY");
        assert_eq!(manager.queue_size(), 0);
    }

    #[test]
    fn list_strategies_names_both() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let names: Vec<String> = service.list_strategies().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Moving Average Crossover", "RSI Mean Reversion"]);
    }

    #[test]
    fn parameter_schema_is_typed() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let specs = service.get_strategy_parameters("RSI Mean Reversion").unwrap();
        let period = specs.iter().find(|s| s.name == "period").unwrap();
        assert_eq!(period.default, 14.0);
        assert!(period.min >= 1.0);

        assert!(service.get_strategy_parameters("nope").is_err());
    }

    #[test]
    fn cancel_responses_carry_outcome() {
        let manager = JobManager::new(1);
        let service = BacktestService::new(&manager);
        let id = service.submit_backtest(request()).unwrap();

        assert!(service.cancel_job(&id).success);
        let again = service.cancel_job(&id);
        assert!(!again.success);
        assert!(!again.message.is_empty());
    }
}
