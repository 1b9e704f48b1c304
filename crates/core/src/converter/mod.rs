//! Media conversion driven by an external ffmpeg binary.
//!
//! A [`ConversionTask`] owns one input file. Running it probes the input
//! duration, spawns ffmpeg with the arguments produced by its
//! [`ConversionPlan`], parses progress from ffmpeg's diagnostic stream and
//! finishes with exactly one [`TaskOutcome`].
//!
//! # Example
//!
//! ```ignore
//! use macan_core::converter::{find_ffmpeg, AudioOptions, ConversionOptions, ConversionTask};
//!
//! let task = ConversionTask::new(
//!     find_ffmpeg(),
//!     "/music/live.flac",
//!     Path::new("/out"),
//!     ConversionOptions::Audio(AudioOptions::default()),
//! );
//! let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let outcome = task.run(&mut tx).await;
//! ```

mod audio;
mod capabilities;
mod error;
mod locator;
mod probe;
mod progress;
mod task;
mod traits;
mod types;
mod video;

pub use capabilities::EncoderCapabilities;
pub use error::ConverterError;
pub use locator::{find_ffmpeg, BinaryLocator, FFMPEG_BINARY};
pub use probe::{parse_duration, probe_duration, DEFAULT_PROBE_TIMEOUT};
pub use progress::{parse_elapsed, percent_of, ProgressTracker, RUNNING_CAP};
pub use task::{output_path_for, CancelHandle, ConversionTask, TaskSettings};
pub use traits::{ConversionPlan, TaskObserver};
pub use types::{
    AudioFormat, AudioOptions, ConversionOptions, ProgressEvent, QualityTier, Resolution,
    TaskEvent, TaskOutcome, TaskState, VideoFormat, VideoOptions, AUDIO_BITRATES,
};
