//! Batch event and bookkeeping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::converter::ProgressEvent;

/// Identifier of a job submitted to a [`JobManager`](super::JobManager).
pub type JobId = Uuid;

/// Event emitted by a batch worker.
///
/// All events for item `i` precede `ItemStarted` for item `i + 1`, and
/// `BatchDone` is always last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    ItemStarted {
        index: usize,
        total: usize,
        filename: String,
    },
    Progress {
        index: usize,
        #[serde(flatten)]
        event: ProgressEvent,
    },
    ItemDone {
        index: usize,
        success: bool,
        message: String,
    },
    BatchDone {
        succeeded: usize,
        failed: usize,
    },
}

/// Aggregate result of a batch.
///
/// Only items that actually ran are counted. An item interrupted by a
/// batch stop counts as failed; items never started count nowhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// The batch was stopped before it ran to completion.
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }
}

/// Public view of a job tracked by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    pub total: usize,
    pub submitted_at: DateTime<Utc>,
}

/// Error type for batch operations.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No active job has this id.
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// The worker task ended abnormally.
    #[error("Batch worker failed: {0}")]
    WorkerFailed(String),
}
