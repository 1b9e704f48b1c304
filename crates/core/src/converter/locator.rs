//! Locating the ffmpeg executable.
//!
//! Search order: next to the installation root, next to the running
//! executable, then the first match on `PATH`. A configured path that
//! exists short-circuits the search.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Platform executable name of the transcoding binary.
pub const FFMPEG_BINARY: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

/// Finds the ffmpeg binary on disk.
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    configured: Option<PathBuf>,
    install_root: Option<PathBuf>,
    module_dir: Option<PathBuf>,
    search_path: bool,
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryLocator {
    /// Creates a locator rooted at the running executable.
    pub fn new() -> Self {
        let module_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let install_root = module_dir
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        Self {
            configured: None,
            install_root,
            module_dir,
            search_path: true,
        }
    }

    /// Creates a locator with explicit roots. `PATH` is still consulted.
    pub fn with_roots(install_root: Option<PathBuf>, module_dir: Option<PathBuf>) -> Self {
        Self {
            configured: None,
            install_root,
            module_dir,
            search_path: true,
        }
    }

    /// Prefers an explicitly configured binary when it exists.
    pub fn with_configured(mut self, path: Option<PathBuf>) -> Self {
        self.configured = path;
        self
    }

    /// Disables the `PATH` fallback.
    pub fn without_search_path(mut self) -> Self {
        self.search_path = false;
        self
    }

    /// Returns the absolute path to the binary, or `None` when it is nowhere to be found.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = self.configured.as_ref().filter(|p| p.is_file()) {
            let path = path
                .canonicalize()
                .or_else(|_| std::path::absolute(path))
                .unwrap_or_else(|_| path.clone());
            debug!("Using configured ffmpeg at {:?}", path);
            return Some(path);
        }

        let adjacent = [self.install_root.as_ref(), self.module_dir.as_ref()];
        for dir in adjacent.into_iter().flatten() {
            let candidate = dir.join(FFMPEG_BINARY);
            if candidate.is_file() {
                debug!("Found ffmpeg next to application at {:?}", candidate);
                return Some(candidate);
            }
        }

        if !self.search_path {
            return None;
        }

        match which::which(FFMPEG_BINARY) {
            Ok(path) => {
                debug!("Found ffmpeg on PATH at {:?}", path);
                Some(path)
            }
            Err(_) => None,
        }
    }
}

/// Locates ffmpeg with the default search order.
pub fn find_ffmpeg() -> Option<PathBuf> {
    BinaryLocator::new().locate()
}
