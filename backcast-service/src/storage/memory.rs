//! In-memory storage adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::job::JobStatus;
use crate::storage::{BarRecord, JobRecord, StorageAdapter, StorageError};

#[derive(Default)]
pub struct MemoryStorage {
    jobs: Mutex<HashMap<String, JobRecord>>,
    bars: Mutex<HashMap<String, Vec<BarRecord>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn save_job(&self, record: &JobRecord) -> Result<(), StorageError> {
        self.jobs.lock().unwrap().insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get_job(&self, id: &str) -> Result<Option<JobRecord>, StorageError> {
        Ok(self.jobs.lock().unwrap().get(id).cloned())
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, StorageError> {
        let mut rows: Vec<JobRecord> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<JobRecord>, StorageError> {
        let mut rows: Vec<JobRecord> = self.jobs.lock().unwrap().values().cloned().collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn update_status(&self, id: &str, status: JobStatus) -> Result<(), StorageError> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs.get_mut(id).ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.status = status;
        if status.is_terminal() && record.completed_at.is_none() {
            record.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn update_result(&self, id: &str, result: &serde_json::Value) -> Result<(), StorageError> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs.get_mut(id).ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        record.result = Some(result.clone());
        Ok(())
    }

    fn delete_job(&self, id: &str) -> Result<(), StorageError> {
        self.jobs.lock().unwrap().remove(id);
        Ok(())
    }

    fn cleanup(&self, older_than: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut jobs = self.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|_, r| {
            !(r.status.is_terminal() && r.completed_at.is_some_and(|t| t < older_than))
        });
        Ok(before - jobs.len())
    }

    fn save_bars(&self, symbol: &str, rows: &[BarRecord]) -> Result<(), StorageError> {
        let mut bars = self.bars.lock().unwrap();
        let entry = bars.entry(symbol.to_string()).or_default();
        entry.extend_from_slice(rows);
        entry.sort_by_key(|r| r.timestamp);
        Ok(())
    }

    fn get_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BarRecord>, StorageError> {
        Ok(self
            .bars
            .lock()
            .unwrap()
            .get(symbol)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.timestamp >= start && r.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StorageError> {
        let mut symbols: Vec<String> = self.bars.lock().unwrap().keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn delete_bars(&self, symbol: &str, before: Option<DateTime<Utc>>) -> Result<(), StorageError> {
        let mut bars = self.bars.lock().unwrap();
        match before {
            None => {
                bars.remove(symbol);
            }
            Some(cutoff) => {
                if let Some(rows) = bars.get_mut(symbol) {
                    rows.retain(|r| r.timestamp >= cutoff);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, status: JobStatus, created_minute: u32) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            status,
            request: serde_json::json!({}),
            result: None,
            error_message: None,
            created_at: Utc.with_ymd_and_hms(2023, 5, 1, 12, created_minute, 0).unwrap(),
            started_at: None,
            completed_at: status
                .is_terminal()
                .then(|| Utc.with_ymd_and_hms(2023, 5, 1, 13, created_minute, 0).unwrap()),
        }
    }

    fn bar(symbol: &str, day: u32) -> BarRecord {
        BarRecord {
            symbol: symbol.to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100,
        }
    }

    #[test]
    fn save_and_get_round_trip() {
        let storage = MemoryStorage::new();
        let r = record("job_a", JobStatus::Pending, 0);
        storage.save_job(&r).unwrap();
        assert_eq!(storage.get_job("job_a").unwrap(), Some(r));
        assert_eq!(storage.get_job("missing").unwrap(), None);
    }

    #[test]
    fn list_by_status_filters_in_creation_order() {
        let storage = MemoryStorage::new();
        storage.save_job(&record("job_b", JobStatus::Pending, 2)).unwrap();
        storage.save_job(&record("job_a", JobStatus::Pending, 1)).unwrap();
        storage.save_job(&record("job_c", JobStatus::Completed, 3)).unwrap();

        let pending = storage.list_by_status(JobStatus::Pending).unwrap();
        let ids: Vec<&str> = pending.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["job_a", "job_b"]);
    }

    #[test]
    fn list_recent_caps_and_orders_newest_first() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            storage.save_job(&record(&format!("job_{i}"), JobStatus::Pending, i)).unwrap();
        }
        let recent = storage.list_recent(2).unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["job_4", "job_3"]);
    }

    #[test]
    fn update_status_stamps_terminal_time() {
        let storage = MemoryStorage::new();
        storage.save_job(&record("job_a", JobStatus::Pending, 0)).unwrap();
        storage.update_status("job_a", JobStatus::Completed).unwrap();
        let row = storage.get_job("job_a").unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        assert!(row.completed_at.is_some());
    }

    #[test]
    fn update_missing_job_is_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.update_status("nope", JobStatus::Failed),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn cleanup_drops_only_old_terminal_jobs() {
        let storage = MemoryStorage::new();
        storage.save_job(&record("done", JobStatus::Completed, 0)).unwrap();
        storage.save_job(&record("live", JobStatus::Running, 1)).unwrap();

        let removed = storage
            .cleanup(Utc.with_ymd_and_hms(2023, 5, 2, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(removed, 1);
        assert!(storage.get_job("done").unwrap().is_none());
        assert!(storage.get_job("live").unwrap().is_some());
    }

    #[test]
    fn bars_round_trip_with_range() {
        let storage = MemoryStorage::new();
        storage
            .save_bars("SPY", &[bar("SPY", 3), bar("SPY", 1), bar("SPY", 5)])
            .unwrap();

        let hit = storage
            .get_bars(
                "SPY",
                Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 1, 4, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(storage.list_symbols().unwrap(), vec!["SPY".to_string()]);
    }

    #[test]
    fn delete_bars_with_cutoff_keeps_newer_rows() {
        let storage = MemoryStorage::new();
        storage.save_bars("SPY", &[bar("SPY", 1), bar("SPY", 5)]).unwrap();
        storage
            .delete_bars("SPY", Some(Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap()))
            .unwrap();
        let rows = storage
            .get_bars(
                "SPY",
                Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);

        storage.delete_bars("SPY", None).unwrap();
        assert!(storage.list_symbols().unwrap().is_empty());
    }
}
