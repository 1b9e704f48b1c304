//! Batch execution: many tasks, one worker per job, strictly in order.

mod manager;
mod runner;
mod types;

pub use manager::JobManager;
pub use runner::{BatchHandle, BatchRunner, BatchStopper};
pub use types::{BatchError, BatchEvent, BatchSummary, JobId, JobInfo};
