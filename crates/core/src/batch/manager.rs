//! Registry of running batch jobs.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::converter::ConversionTask;

use super::runner::{BatchRunner, BatchStopper};
use super::types::{BatchError, BatchEvent, JobId, JobInfo};

struct JobEntry {
    info: JobInfo,
    stopper: BatchStopper,
}

type JobMap = HashMap<JobId, JobEntry>;

fn lock(jobs: &Mutex<JobMap>) -> MutexGuard<'_, JobMap> {
    jobs.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the active batch jobs, one worker each.
///
/// A job leaves the registry when its worker finishes, before its
/// `BatchDone` event is sent.
#[derive(Clone, Default)]
pub struct JobManager {
    jobs: Arc<Mutex<JobMap>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a batch for `tasks` and returns its id and event stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        tasks: Vec<ConversionTask>,
    ) -> (JobId, mpsc::UnboundedReceiver<BatchEvent>) {
        let id = Uuid::new_v4();
        let info = JobInfo {
            id,
            total: tasks.len(),
            submitted_at: Utc::now(),
        };

        // Held until the entry is inserted so the finish hook cannot run first.
        let mut jobs = lock(&self.jobs);

        let registry = Arc::clone(&self.jobs);
        let runner = BatchRunner::new(tasks).on_finish(move || {
            lock(&registry).remove(&id);
            debug!("Job {} removed from registry", id);
        });
        let (stopper, events, _worker) = runner.start().into_parts();

        info!("Submitted job {} with {} item(s)", id, info.total);
        jobs.insert(id, JobEntry { info, stopper });
        (id, events)
    }

    /// Stops one job.
    pub fn stop(&self, id: &JobId) -> Result<(), BatchError> {
        let jobs = lock(&self.jobs);
        let entry = jobs.get(id).ok_or(BatchError::JobNotFound(*id))?;
        info!("Stopping job {}", id);
        entry.stopper.stop();
        Ok(())
    }

    /// Stops every active job and returns how many were signalled.
    pub fn stop_all(&self) -> usize {
        let jobs = lock(&self.jobs);
        for entry in jobs.values() {
            entry.stopper.stop();
        }
        if !jobs.is_empty() {
            info!("Stopping {} job(s)", jobs.len());
        }
        jobs.len()
    }

    pub fn is_active(&self, id: &JobId) -> bool {
        lock(&self.jobs).contains_key(id)
    }

    /// Active jobs, oldest first.
    pub fn active_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = lock(&self.jobs)
            .values()
            .map(|entry| entry.info.clone())
            .collect();
        jobs.sort_by_key(|info| info.submitted_at);
        jobs
    }

    /// Drops a job from the registry without stopping it.
    pub fn remove(&self, id: &JobId) -> Option<JobInfo> {
        lock(&self.jobs).remove(id).map(|entry| entry.info)
    }
}
