//! Sequential execution of a list of conversion tasks on one worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::converter::{CancelHandle, ConversionTask, ProgressEvent, TaskObserver, TaskOutcome};

use super::types::{BatchError, BatchEvent, BatchSummary};

type FinishHook = Box<dyn FnOnce() + Send>;

#[derive(Debug, Default)]
struct BatchControl {
    stopped: AtomicBool,
    current: Mutex<Option<CancelHandle>>,
}

impl BatchControl {
    fn current(&self) -> std::sync::MutexGuard<'_, Option<CancelHandle>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers the next task unless the batch was stopped.
    ///
    /// The flag is checked under the same lock `stop` takes, so a task is
    /// either refused here or cancelled by `stop`.
    fn begin(&self, handle: CancelHandle) -> bool {
        let mut current = self.current();
        if self.is_stopped() {
            return false;
        }
        *current = Some(handle);
        true
    }

    fn finish(&self) {
        *self.current() = None;
    }

    fn stop(&self) {
        let current = self.current();
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = current.as_ref() {
            handle.cancel();
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Stops a running batch. Cloneable and safe from any thread.
#[derive(Debug, Clone)]
pub struct BatchStopper {
    control: Arc<BatchControl>,
}

impl BatchStopper {
    /// Prevents further items from starting and cancels the active one.
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }
}

/// Forwards one item's task events into the batch channel.
struct ItemObserver {
    index: usize,
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl TaskObserver for ItemObserver {
    fn progress(&mut self, event: ProgressEvent) {
        let _ = self.tx.send(BatchEvent::Progress {
            index: self.index,
            event,
        });
    }

    fn done(&mut self, outcome: &TaskOutcome) {
        let _ = self.tx.send(BatchEvent::ItemDone {
            index: self.index,
            success: outcome.is_success(),
            message: outcome.message(),
        });
    }
}

/// Runs tasks one after another on a single background worker.
pub struct BatchRunner {
    tasks: Vec<ConversionTask>,
    on_finish: Option<FinishHook>,
}

impl BatchRunner {
    pub fn new(tasks: Vec<ConversionTask>) -> Self {
        Self {
            tasks,
            on_finish: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs `hook` on the worker after the last item and before `BatchDone`.
    pub(crate) fn on_finish(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(hook));
        self
    }

    /// Spawns exactly one worker and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> BatchHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = Arc::new(BatchControl::default());
        let worker_control = Arc::clone(&control);
        let Self { tasks, on_finish } = self;

        let worker = tokio::spawn(async move {
            let summary = run_items(&tasks, &worker_control, &tx).await;
            if let Some(hook) = on_finish {
                hook();
            }
            let _ = tx.send(BatchEvent::BatchDone {
                succeeded: summary.succeeded,
                failed: summary.failed,
            });
            summary
        });

        BatchHandle {
            stopper: BatchStopper { control },
            events: rx,
            worker,
        }
    }
}

async fn run_items(
    tasks: &[ConversionTask],
    control: &BatchControl,
    tx: &mpsc::UnboundedSender<BatchEvent>,
) -> BatchSummary {
    let total = tasks.len();
    let mut summary = BatchSummary::default();

    for (index, task) in tasks.iter().enumerate() {
        if !control.begin(task.cancel_handle()) {
            debug!("Batch stopped before item {} of {}", index + 1, total);
            break;
        }

        let filename = task.file_name();
        info!("Batch item {}/{}: {}", index + 1, total, filename);
        let _ = tx.send(BatchEvent::ItemStarted {
            index,
            total,
            filename,
        });

        let mut observer = ItemObserver {
            index,
            tx: tx.clone(),
        };
        let outcome = task.run(&mut observer).await;
        control.finish();

        if outcome.is_success() {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }

    summary.cancelled = control.is_stopped();
    info!(
        "Batch finished: {} succeeded, {} failed{}",
        summary.succeeded,
        summary.failed,
        if summary.cancelled { " (stopped)" } else { "" }
    );
    summary
}

/// Caller side of a started batch.
pub struct BatchHandle {
    stopper: BatchStopper,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    worker: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    pub fn stop(&self) {
        self.stopper.stop();
    }

    pub fn stopper(&self) -> BatchStopper {
        self.stopper.clone()
    }

    /// Event stream of the batch, ending after `BatchDone`.
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<BatchEvent> {
        &mut self.events
    }

    /// Waits for the worker. Undelivered events are discarded.
    pub async fn wait(self) -> Result<BatchSummary, BatchError> {
        self.worker
            .await
            .map_err(|e| BatchError::WorkerFailed(e.to_string()))
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BatchStopper,
        mpsc::UnboundedReceiver<BatchEvent>,
        JoinHandle<BatchSummary>,
    ) {
        (self.stopper, self.events, self.worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{AudioOptions, ConversionOptions};
    use std::path::Path;

    fn missing_binary_task(name: &str) -> ConversionTask {
        ConversionTask::new(
            None,
            format!("/in/{}", name),
            Path::new("/out"),
            ConversionOptions::Audio(AudioOptions::default()),
        )
    }

    async fn collect(handle: &mut BatchHandle) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.events().recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_empty_batch_reports_done() {
        let mut handle = BatchRunner::new(Vec::new()).start();
        let events = collect(&mut handle).await;
        assert_eq!(
            events,
            vec![BatchEvent::BatchDone {
                succeeded: 0,
                failed: 0
            }]
        );
        let summary = handle.wait().await.unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn test_failures_counted_as_failures() {
        let tasks = vec![missing_binary_task("a.wav"), missing_binary_task("b.wav")];
        let mut handle = BatchRunner::new(tasks).start();
        let events = collect(&mut handle).await;

        let started: Vec<(usize, String)> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::ItemStarted {
                    index, filename, ..
                } => Some((*index, filename.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![(0, "a.wav".to_string()), (1, "b.wav".to_string())]
        );
        assert_eq!(
            events.last(),
            Some(&BatchEvent::BatchDone {
                succeeded: 0,
                failed: 2
            })
        );

        let summary = handle.wait().await.unwrap();
        assert_eq!(summary.failed, 2);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn test_stop_before_first_item() {
        let control = BatchControl::default();
        control.stop();
        assert!(!control.begin(CancelHandle::new()));
    }

    #[tokio::test]
    async fn test_stop_cancels_registered_task() {
        let control = BatchControl::default();
        let handle = CancelHandle::new();
        assert!(control.begin(handle.clone()));
        control.stop();
        assert!(handle.is_cancelled());
        control.finish();
        assert!(!control.begin(CancelHandle::new()));
    }

    #[tokio::test]
    async fn test_finish_hook_runs_before_batch_done() {
        let flag = Arc::new(AtomicBool::new(false));
        let hook_flag = Arc::clone(&flag);
        let mut handle = BatchRunner::new(vec![missing_binary_task("a.wav")])
            .on_finish(move || hook_flag.store(true, Ordering::SeqCst))
            .start();

        while let Some(event) = handle.events().recv().await {
            if matches!(event, BatchEvent::BatchDone { .. }) {
                assert!(flag.load(Ordering::SeqCst));
            }
        }
        assert!(flag.load(Ordering::SeqCst));
    }
}
