//! Narrow persistence interface the host wires to its store.
//!
//! The job manager treats persistence as best-effort: adapter failures are
//! logged and never fail a job. The in-memory adapter backs tests and
//! storeless deployments.

pub mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::job::JobStatus;

pub use memory::MemoryStorage;

/// Persisted job row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub request: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Persisted OHLCV row.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRecord {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

pub trait StorageAdapter: Send + Sync {
    // Jobs
    fn save_job(&self, record: &JobRecord) -> Result<(), StorageError>;
    fn get_job(&self, id: &str) -> Result<Option<JobRecord>, StorageError>;
    fn list_by_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, StorageError>;
    /// Most recent jobs first, by creation time.
    fn list_recent(&self, limit: usize) -> Result<Vec<JobRecord>, StorageError>;
    fn update_status(&self, id: &str, status: JobStatus) -> Result<(), StorageError>;
    fn update_result(&self, id: &str, result: &serde_json::Value) -> Result<(), StorageError>;
    fn delete_job(&self, id: &str) -> Result<(), StorageError>;
    /// Delete terminal jobs completed before `older_than`; returns the count.
    fn cleanup(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError>;

    // Market data
    fn save_bars(&self, symbol: &str, rows: &[BarRecord]) -> Result<(), StorageError>;
    fn get_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, StorageError>;
    fn list_symbols(&self) -> Result<Vec<String>, StorageError>;
    /// Delete a symbol's bars, optionally only those before a cutoff.
    fn delete_bars(&self, symbol: &str, before: Option<DateTime<Utc>>) -> Result<(), StorageError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
