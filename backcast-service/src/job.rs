//! Job lifecycle record.
//!
//! State machine: PENDING -> RUNNING -> COMPLETED | FAILED, with
//! PENDING -> CANCELLED before execution starts. Once RUNNING, only the
//! executing worker writes the job; readers take registry snapshots that
//! may trail by one progress tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dto::{BacktestRequest, BacktestResults, JobStatusResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub request: BacktestRequest,
    pub result: Option<BacktestResults>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: f64,
    pub current_step: String,
}

impl Job {
    pub fn new(id: String, request: BacktestRequest) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            request,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0.0,
            current_step: String::new(),
        }
    }

    /// Status DTO snapshot, with a completion estimate extrapolated from
    /// elapsed time and progress while RUNNING.
    pub fn status_response(&self, now: DateTime<Utc>) -> JobStatusResponse {
        let start_time_ms = self.started_at.map(|t| t.timestamp_millis()).unwrap_or(0);

        let estimated_completion_ms = match (self.status, self.started_at) {
            (JobStatus::Running, Some(started)) if self.progress > 0.0 => {
                let elapsed_ms = (now - started).num_milliseconds().max(0) as f64;
                started.timestamp_millis() + (elapsed_ms / self.progress) as i64
            }
            _ => 0,
        };

        JobStatusResponse {
            job_id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.current_step.clone(),
            start_time_ms,
            estimated_completion_ms,
        }
    }
}
