use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::converter::{AudioOptions, BinaryLocator, TaskSettings, VideoOptions};

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// How ffmpeg is found and supervised.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Explicit ffmpeg binary. Used only when the file exists.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    /// Limit for the duration probe (default: 10)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Kill a conversion that stays silent this long. Unset disables it.
    #[serde(default)]
    pub stall_timeout_secs: Option<u64>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            probe_timeout_secs: default_probe_timeout(),
            stall_timeout_secs: None,
        }
    }
}

fn default_probe_timeout() -> u64 {
    10
}

impl ConverterConfig {
    pub fn task_settings(&self) -> TaskSettings {
        TaskSettings {
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            stall_timeout: self.stall_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn locator(&self) -> BinaryLocator {
        BinaryLocator::new().with_configured(self.ffmpeg_path.clone())
    }
}

/// Option defaults applied when the command line leaves them out.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub audio: AudioOptions,
    #[serde(default)]
    pub video: VideoOptions,
}
