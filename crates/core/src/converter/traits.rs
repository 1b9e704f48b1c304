//! Trait definitions for the converter module.

use std::ffi::OsString;
use std::path::Path;
use tokio::sync::mpsc;

use super::types::{ProgressEvent, TaskEvent, TaskOutcome};

/// Produces the ffmpeg argument list for one kind of conversion.
///
/// Implementations are pure: the same options, input and output always
/// yield the same arguments, without touching the filesystem.
pub trait ConversionPlan: Send + Sync {
    /// Builds the arguments that follow the binary name. Paths are passed
    /// through byte for byte.
    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString>;

    /// Extension of the produced file, without the dot.
    fn extension(&self) -> &'static str;

    /// Status line reported while the input duration is probed.
    fn probe_status(&self) -> &'static str;
}

/// Receives the events of a single running task.
///
/// Calls arrive on the task's own worker, in order: zero or more
/// `progress` calls followed by exactly one `done`.
pub trait TaskObserver: Send {
    fn progress(&mut self, event: ProgressEvent);

    fn done(&mut self, outcome: &TaskOutcome);
}

/// Forwards events into a channel. A dropped receiver is not an error,
/// the task keeps running without an audience.
impl TaskObserver for mpsc::UnboundedSender<TaskEvent> {
    fn progress(&mut self, event: ProgressEvent) {
        let _ = self.send(TaskEvent::Progress(event));
    }

    fn done(&mut self, outcome: &TaskOutcome) {
        let _ = self.send(TaskEvent::Done {
            success: outcome.is_success(),
            message: outcome.message(),
        });
    }
}

/// Discards every event.
impl TaskObserver for () {
    fn progress(&mut self, _event: ProgressEvent) {}

    fn done(&mut self, _outcome: &TaskOutcome) {}
}
