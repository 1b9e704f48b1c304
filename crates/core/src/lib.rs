pub mod batch;
pub mod config;
pub mod converter;

pub use batch::{BatchEvent, BatchHandle, BatchRunner, BatchSummary, JobId, JobManager};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use converter::{
    find_ffmpeg, BinaryLocator, CancelHandle, ConversionOptions, ConversionTask, ConverterError,
    TaskEvent, TaskOutcome,
};
