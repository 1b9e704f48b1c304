//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or running a conversion.
///
/// The `Display` text of every variant is shown to users verbatim.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// No ffmpeg binary could be located.
    #[error("ffmpeg not found. Place ffmpeg next to the application or install it on your PATH.")]
    BinaryNotFound,

    /// The binary exists but could not be started.
    #[error("Failed to start {}: {source}", .path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The binary ran and exited with a non-zero status.
    #[error("{binary} exited with code {code}.")]
    NonZeroExit { binary: String, code: i32 },

    /// The binary was terminated without an exit code (signal).
    #[error("{binary} was terminated before it finished.")]
    Terminated { binary: String },

    /// The binary stopped producing diagnostic output.
    #[error("{binary} produced no output for {secs} seconds.")]
    Stalled { binary: String, secs: u64 },

    /// Requested format is not in the supported set.
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// An option value is not understood.
    #[error("Invalid option: {reason}")]
    InvalidOption { reason: String },

    /// I/O error while talking to the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The conversion was cancelled by the caller.
    #[error("Conversion cancelled.")]
    Cancelled,
}

impl ConverterError {
    /// Creates a spawn error, mapping "not found" to [`ConverterError::BinaryNotFound`].
    pub fn spawn_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::BinaryNotFound;
        }
        Self::SpawnFailed {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is the distinct cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_spawn_not_found_maps_to_binary_not_found() {
        let err = ConverterError::spawn_failed(
            "/opt/ffmpeg",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, ConverterError::BinaryNotFound));
        assert!(err.to_string().starts_with("ffmpeg not found"));
    }

    #[test]
    fn test_spawn_failed_embeds_os_error() {
        let err = ConverterError::spawn_failed(
            "/opt/ffmpeg",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to start /opt/ffmpeg: permission denied"
        );
    }

    #[test]
    fn test_cancelled_message() {
        assert!(ConverterError::Cancelled.is_cancelled());
        assert_eq!(ConverterError::Cancelled.to_string(), "Conversion cancelled.");
    }
}
