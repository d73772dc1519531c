//! Job manager: bounded worker pool over a FIFO queue.
//!
//! The registry (id -> Job) sits behind one mutex, held only for map
//! operations and short status/progress writes. The queue has its own
//! mutex plus a condvar; `stop()` broadcasts under that mutex so no
//! wakeup is lost. A job handed to a worker is single-writer from then
//! on; readers take registry snapshots that may trail by one tick.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use backcast_core::{BacktestEngine, BacktestError};
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::dto::{BacktestRequest, BacktestResults, JobStatusResponse};
use crate::job::{Job, JobStatus};
use crate::storage::{JobRecord, StorageAdapter};

/// Observer for job progress: (job_id, progress, step).
pub type ProgressCallback = Box<dyn Fn(&str, f64, &str) + Send + Sync>;

pub struct JobManager {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

struct Shared {
    engine: BacktestEngine,
    jobs: Mutex<HashMap<String, Job>>,
    queue: Mutex<VecDeque<String>>,
    queue_cv: Condvar,
    running: AtomicBool,
    running_jobs: AtomicUsize,
    job_counter: AtomicU64,
    callback: Mutex<Option<ProgressCallback>>,
    storage: Option<Arc<dyn StorageAdapter>>,
}

impl JobManager {
    /// Manager with `worker_count` workers and no persistence.
    pub fn new(worker_count: usize) -> Self {
        Self::build(worker_count, None)
    }

    /// Manager whose job transitions are mirrored into `storage`.
    pub fn with_storage(worker_count: usize, storage: Arc<dyn StorageAdapter>) -> Self {
        Self::build(worker_count, Some(storage))
    }

    fn build(worker_count: usize, storage: Option<Arc<dyn StorageAdapter>>) -> Self {
        assert!(worker_count >= 1, "worker_count must be >= 1");
        Self {
            shared: Arc::new(Shared {
                engine: BacktestEngine::new(),
                jobs: Mutex::new(HashMap::new()),
                queue: Mutex::new(VecDeque::new()),
                queue_cv: Condvar::new(),
                running: AtomicBool::new(false),
                running_jobs: AtomicUsize::new(0),
                job_counter: AtomicU64::new(0),
                callback: Mutex::new(None),
                storage,
            }),
            workers: Mutex::new(Vec::new()),
            worker_count,
        }
    }

    /// The strategy registry backing this manager's engine.
    pub fn registry(&self) -> &backcast_core::strategy::StrategyRegistry {
        self.shared.engine.registry()
    }

    /// Spawn the worker pool. Idempotent.
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers.lock().unwrap();
        for i in 0..self.worker_count {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("backcast-worker-{i}"))
                .spawn(move || worker_loop(&shared))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        debug!(workers = self.worker_count, "job manager started");
    }

    /// Stop accepting dequeues and join the workers.
    ///
    /// In-flight jobs run to their terminal state; still-PENDING jobs stay
    /// queued and are discarded with the manager.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        {
            // Broadcast under the queue mutex so no worker misses the flag.
            let _queue = self.shared.queue.lock().unwrap();
            self.shared.queue_cv.notify_all();
        }
        let workers: Vec<JoinHandle<()>> = self.workers.lock().unwrap().drain(..).collect();
        for handle in workers {
            if let Err(e) = handle.join() {
                warn!("worker panicked during shutdown: {e:?}");
            }
        }
        debug!("job manager stopped");
    }

    /// Create a PENDING job, enqueue it, and return its id. Never blocks.
    pub fn submit(&self, mut request: BacktestRequest) -> String {
        let id = if request.job_id.is_empty() {
            self.generate_job_id()
        } else {
            request.job_id.clone()
        };
        request.job_id = id.clone();

        let job = Job::new(id.clone(), request);
        self.shared.persist_new(&job);
        self.shared.jobs.lock().unwrap().insert(id.clone(), job);

        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(id.clone());
            self.shared.queue_cv.notify_one();
        }
        id
    }

    /// PENDING -> CANCELLED. False for unknown ids and any other state.
    pub fn cancel(&self, job_id: &str) -> bool {
        let cancelled = {
            let mut jobs = self.shared.jobs.lock().unwrap();
            match jobs.get_mut(job_id) {
                Some(job) if job.status == JobStatus::Pending => {
                    job.status = JobStatus::Cancelled;
                    job.completed_at = Some(Utc::now());
                    true
                }
                _ => false,
            }
        };
        if cancelled {
            self.shared.persist_status(job_id, JobStatus::Cancelled);
        }
        cancelled
    }

    /// Status snapshot. Unknown ids report FAILED with a not-found message.
    pub fn get_status(&self, job_id: &str) -> JobStatusResponse {
        let jobs = self.shared.jobs.lock().unwrap();
        match jobs.get(job_id) {
            Some(job) => job.status_response(Utc::now()),
            None => JobStatusResponse {
                job_id: job_id.to_string(),
                status: JobStatus::Failed,
                progress: 0.0,
                message: "Job not found".to_string(),
                start_time_ms: 0,
                estimated_completion_ms: 0,
            },
        }
    }

    /// The result iff the job COMPLETED; the empty sentinel otherwise.
    pub fn get_result(&self, job_id: &str) -> BacktestResults {
        let jobs = self.shared.jobs.lock().unwrap();
        match jobs.get(job_id) {
            Some(job) if job.status == JobStatus::Completed => {
                job.result.clone().unwrap_or_else(|| BacktestResults::empty(job_id))
            }
            _ => BacktestResults::empty(job_id),
        }
    }

    /// Full snapshot of a job's record.
    pub fn snapshot(&self, job_id: &str) -> Option<Job> {
        self.shared.jobs.lock().unwrap().get(job_id).cloned()
    }

    /// Register the (single) progress callback, replacing any previous one.
    pub fn set_progress_callback(&self, callback: ProgressCallback) {
        *self.shared.callback.lock().unwrap() = Some(callback);
    }

    pub fn queue_size(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    pub fn running_jobs(&self) -> usize {
        self.shared.running_jobs.load(Ordering::SeqCst)
    }

    /// Drop terminal jobs whose terminal timestamp is older than
    /// `now - max_age`. Returns how many were removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut jobs = self.shared.jobs.lock().unwrap();
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_terminal() && job.completed_at.is_some_and(|t| t < cutoff))
        });
        before - jobs.len()
    }

    fn generate_job_id(&self) -> String {
        let counter = self.shared.job_counter.fetch_add(1, Ordering::Relaxed);
        let timestamp = Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
        format!("job_{timestamp}_{counter}_{suffix}")
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Arc<Shared>) {
    loop {
        let job_id = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if !shared.running.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(id) = queue.pop_front() {
                    break id;
                }
                queue = shared.queue_cv.wait(queue).unwrap();
            }
        };

        // Jobs cancelled while queued are skipped, not executed.
        if !shared.mark_running(&job_id) {
            continue;
        }

        shared.running_jobs.fetch_add(1, Ordering::SeqCst);
        shared.execute(&job_id);
        shared.running_jobs.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    /// PENDING -> RUNNING under the registry lock. False when the job was
    /// cancelled (or vanished) before a worker reached it.
    fn mark_running(&self, job_id: &str) -> bool {
        let claimed = {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(job_id) {
                Some(job) if job.status == JobStatus::Pending => {
                    job.status = JobStatus::Running;
                    job.started_at = Some(Utc::now());
                    job.current_step = "Starting execution".to_string();
                    true
                }
                _ => false,
            }
        };
        if claimed {
            self.persist_status(job_id, JobStatus::Running);
        }
        claimed
    }

    fn execute(&self, job_id: &str) {
        let request = {
            let jobs = self.jobs.lock().unwrap();
            match jobs.get(job_id) {
                Some(job) => job.request.clone(),
                None => return,
            }
        };

        let mut on_progress = |progress: f64, step: &str| {
            self.update_progress(job_id, progress, step);
        };

        let outcome = self.engine.run(
            &request.data_path,
            &request.strategy_name,
            &request.strategy_params,
            request.initial_cash,
            &mut on_progress,
        );

        match outcome {
            Ok(run) => self.mark_completed(job_id, BacktestResults::from_run(job_id, &run)),
            Err(e) => self.mark_failed(job_id, &e),
        }
    }

    /// Write progress under the registry lock, then notify the callback
    /// outside it. Kernel progress is monotone per job, so snapshots are
    /// monotone too.
    fn update_progress(&self, job_id: &str, progress: f64, step: &str) {
        {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.get_mut(job_id) {
                Some(job) => {
                    job.progress = progress;
                    job.current_step = step.to_string();
                }
                None => return,
            }
        }
        self.notify(job_id, progress, step);
    }

    fn mark_completed(&self, job_id: &str, results: BacktestResults) {
        let result_json = serde_json::to_value(&results).ok();
        {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(job_id) else { return };
            job.status = JobStatus::Completed;
            job.result = Some(results);
            job.completed_at = Some(Utc::now());
            job.progress = 1.0;
            job.current_step = "Completed".to_string();
        }
        self.persist_status(job_id, JobStatus::Completed);
        if let (Some(storage), Some(json)) = (&self.storage, result_json) {
            if let Err(e) = storage.update_result(job_id, &json) {
                warn!(job_id, error = %e, "failed to persist job result");
            }
        }
        self.notify(job_id, 1.0, "Completed");
    }

    fn mark_failed(&self, job_id: &str, error: &BacktestError) {
        let step = format!("Failed: {error}");
        let progress = {
            let mut jobs = self.jobs.lock().unwrap();
            let Some(job) = jobs.get_mut(job_id) else { return };
            job.status = JobStatus::Failed;
            job.error_message = Some(format!("{}: {error}", error.code()));
            job.completed_at = Some(Utc::now());
            job.current_step = step.clone();
            job.progress
        };
        self.persist_status(job_id, JobStatus::Failed);
        // One final report at the progress the job failed at.
        self.notify(job_id, progress, &step);
    }

    fn notify(&self, job_id: &str, progress: f64, step: &str) {
        let callback = self.callback.lock().unwrap();
        if let Some(cb) = callback.as_ref() {
            cb(job_id, progress, step);
        }
    }

    fn persist_new(&self, job: &Job) {
        let Some(storage) = &self.storage else { return };
        let record = JobRecord {
            id: job.id.clone(),
            status: job.status,
            request: serde_json::to_value(&job.request).unwrap_or(serde_json::Value::Null),
            result: None,
            error_message: None,
            created_at: job.created_at,
            started_at: None,
            completed_at: None,
        };
        if let Err(e) = storage.save_job(&record) {
            warn!(job_id = %job.id, error = %e, "failed to persist new job");
        }
    }

    fn persist_status(&self, job_id: &str, status: JobStatus) {
        let Some(storage) = &self.storage else { return };
        if let Err(e) = storage.update_status(job_id, status) {
            warn!(job_id, error = %e, "failed to persist job status");
        }
    }
}
