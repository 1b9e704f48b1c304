//! A single input-to-output conversion driven by ffmpeg.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::error::ConverterError;
use super::probe::{probe_duration, DEFAULT_PROBE_TIMEOUT};
use super::progress::ProgressTracker;
use super::traits::{ConversionPlan, TaskObserver};
use super::types::{ConversionOptions, ProgressEvent, TaskOutcome, TaskState};

const READ_BUFFER_SIZE: usize = 4096;

/// Builds `{output_dir}/{input stem}.{extension}`.
///
/// Pure: the input's own extension is dropped and nothing is created.
pub fn output_path_for(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let mut name = input.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(extension);
    output_dir.join(name)
}

impl ConversionPlan for ConversionOptions {
    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        match self {
            Self::Audio(audio) | Self::ExtractAudio(audio) => audio.build_args(input, output),
            Self::Video(video) => video.build_args(input, output),
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Audio(audio) | Self::ExtractAudio(audio) => audio.extension(),
            Self::Video(video) => video.extension(),
        }
    }

    fn probe_status(&self) -> &'static str {
        match self {
            Self::Audio(audio) | Self::ExtractAudio(audio) => audio.probe_status(),
            Self::Video(video) => video.probe_status(),
        }
    }
}

/// Timing knobs for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSettings {
    /// Hard limit for the duration probe.
    pub probe_timeout: Duration,
    /// Kill the child if it stays silent this long. `None` disables it.
    pub stall_timeout: Option<Duration>,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            stall_timeout: None,
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Thread-safe cancellation flag shared with a running task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent; wakes the task so the child is
    /// killed without waiting for its next chunk of output.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            self.inner.notify.notified().await;
        }
    }
}

enum Chunk {
    Data(usize),
    Eof,
    Stalled,
}

async fn read_chunk(
    stderr: &mut ChildStderr,
    buf: &mut [u8],
    stall_timeout: Option<Duration>,
) -> std::io::Result<Chunk> {
    let read = match stall_timeout {
        Some(limit) => match tokio::time::timeout(limit, stderr.read(buf)).await {
            Ok(read) => read?,
            Err(_) => return Ok(Chunk::Stalled),
        },
        None => stderr.read(buf).await?,
    };
    Ok(if read == 0 { Chunk::Eof } else { Chunk::Data(read) })
}

/// Force-kills the child. Killing an exited process is not an error.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Kill of ffmpeg child returned: {}", e);
    }
}

/// One conversion of `input_path` into `output_path`.
#[derive(Debug)]
pub struct ConversionTask {
    binary: Option<PathBuf>,
    input_path: PathBuf,
    output_path: PathBuf,
    options: ConversionOptions,
    settings: TaskSettings,
    cancel: CancelHandle,
    started: AtomicBool,
    state: Mutex<TaskState>,
}

impl ConversionTask {
    /// Creates a task. `binary` of `None` means ffmpeg was not found; the
    /// task then fails immediately when run.
    pub fn new(
        binary: Option<PathBuf>,
        input_path: impl Into<PathBuf>,
        output_dir: &Path,
        options: ConversionOptions,
    ) -> Self {
        let input_path = input_path.into();
        let output_path = output_path_for(&input_path, output_dir, options.extension());
        Self {
            binary,
            input_path,
            output_path,
            options,
            settings: TaskSettings::default(),
            cancel: CancelHandle::new(),
            started: AtomicBool::new(false),
            state: Mutex::new(TaskState::Idle),
        }
    }

    pub fn with_settings(mut self, settings: TaskSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Base name of the input, as shown to users.
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.to_string_lossy().into_owned())
    }

    /// Full argument list this task passes to ffmpeg.
    pub fn args(&self) -> Vec<OsString> {
        self.options.build_args(&self.input_path, &self.output_path)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels the task. Safe from any thread, at any time, repeatedly.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn binary_name(&self, binary: &Path) -> String {
        binary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ffmpeg".to_string())
    }

    /// Runs the conversion to a terminal state.
    ///
    /// The observer receives zero or more progress events followed by
    /// exactly one `done`. A task runs at most once; later calls fail
    /// without notifying the observer.
    pub async fn run(&self, observer: &mut dyn TaskObserver) -> TaskOutcome {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Task for {:?} was already run", self.input_path);
            return TaskOutcome::Failed("Task has already been run.".to_string());
        }

        let outcome = match self.execute(observer).await {
            Ok(()) => TaskOutcome::Succeeded,
            Err(e) => TaskOutcome::from(e),
        };

        self.set_state(TaskState::from(&outcome));
        match &outcome {
            TaskOutcome::Succeeded => {
                info!("Converted {:?} -> {:?}", self.input_path, self.output_path);
            }
            TaskOutcome::Cancelled => {
                info!("Conversion of {:?} cancelled", self.input_path);
            }
            TaskOutcome::Failed(message) => {
                warn!("Conversion of {:?} failed: {}", self.input_path, message);
            }
        }
        observer.done(&outcome);
        outcome
    }

    async fn execute(&self, observer: &mut dyn TaskObserver) -> Result<(), ConverterError> {
        let binary = self.binary.as_deref().ok_or(ConverterError::BinaryNotFound)?;
        let binary_name = self.binary_name(binary);

        if self.cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        observer.progress(ProgressEvent::new(0, self.options.probe_status()));
        let total_secs = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ConverterError::Cancelled),
            secs = probe_duration(binary, &self.input_path, self.settings.probe_timeout) => secs,
        };
        if total_secs.is_none() {
            debug!(
                "No duration for {:?}, progress will not show a percentage",
                self.input_path
            );
        }

        let args = self.args();
        debug!(
            "ffmpeg command: {} {}",
            binary.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConverterError::spawn_failed(binary, e))?;
        self.set_state(TaskState::Running);
        info!("Started {} for {:?} (pid {:?})", binary_name, self.input_path, child.id());

        let Some(mut stderr) = child.stderr.take() else {
            terminate(&mut child).await;
            return Err(ConverterError::Io(std::io::Error::other(
                "stderr of ffmpeg was not captured",
            )));
        };

        let mut tracker = ProgressTracker::new(total_secs);
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            if self.cancel.is_cancelled() {
                terminate(&mut child).await;
                return Err(ConverterError::Cancelled);
            }

            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => continue,
                chunk = read_chunk(&mut stderr, &mut buf, self.settings.stall_timeout) => chunk,
            };

            match chunk {
                Ok(Chunk::Data(n)) => {
                    for event in tracker.feed(&buf[..n]) {
                        observer.progress(event);
                    }
                }
                Ok(Chunk::Eof) => break,
                Ok(Chunk::Stalled) => {
                    terminate(&mut child).await;
                    let secs = self.settings.stall_timeout.map(|d| d.as_secs()).unwrap_or_default();
                    return Err(ConverterError::Stalled {
                        binary: binary_name,
                        secs,
                    });
                }
                Err(e) => {
                    terminate(&mut child).await;
                    return Err(ConverterError::Io(e));
                }
            }
        }

        let status = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                terminate(&mut child).await;
                return Err(ConverterError::Cancelled);
            }
            status = child.wait() => status?,
        };

        if self.cancel.is_cancelled() {
            return Err(ConverterError::Cancelled);
        }

        match status.code() {
            Some(0) => {
                observer.progress(ProgressEvent::new(100, "Done"));
                Ok(())
            }
            Some(code) => Err(ConverterError::NonZeroExit {
                binary: binary_name,
                code,
            }),
            None => Err(ConverterError::Terminated {
                binary: binary_name,
            }),
        }
    }
}
