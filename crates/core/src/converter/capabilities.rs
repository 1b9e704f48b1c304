//! Hardware encoder capability detection.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// NVENC encoders reported by `ffmpeg -encoders`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// NVIDIA NVENC H.264 available
    pub h264_nvenc: bool,
    /// NVIDIA NVENC H.265/HEVC available
    pub hevc_nvenc: bool,
}

impl EncoderCapabilities {
    /// Detect available hardware encoders by probing ffmpeg.
    ///
    /// Any failure yields the empty set.
    pub async fn detect(binary: &Path) -> Self {
        let output = Command::new(binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => {
                let caps = Self::from_encoder_list(&String::from_utf8_lossy(&o.stdout));
                debug!("Detected encoder capabilities: {:?}", caps);
                caps
            }
            _ => Self::default(),
        }
    }

    /// Parses the listing printed by `ffmpeg -encoders`.
    pub fn from_encoder_list(listing: &str) -> Self {
        let has = |name: &str| {
            listing
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(name))
        };
        Self {
            h264_nvenc: has("h264_nvenc"),
            hevc_nvenc: has("hevc_nvenc"),
        }
    }

    pub fn has_nvenc(&self) -> bool {
        self.h264_nvenc || self.hevc_nvenc
    }

    /// Whether `encoder` can be used. Software encoders are assumed present.
    pub fn supports(&self, encoder: &str) -> bool {
        match encoder {
            "h264_nvenc" => self.h264_nvenc,
            "hevc_nvenc" => self.hevc_nvenc,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_from_encoder_list() {
        let caps = EncoderCapabilities::from_encoder_list(LISTING);
        assert!(caps.h264_nvenc);
        assert!(!caps.hevc_nvenc);
        assert!(caps.has_nvenc());
    }

    #[test]
    fn test_description_mentions_do_not_count() {
        let caps = EncoderCapabilities::from_encoder_list(
            " V....D libx265    libx265 H.265 (hevc_nvenc not built in)\n",
        );
        assert!(!caps.has_nvenc());
    }

    #[test]
    fn test_supports() {
        let caps = EncoderCapabilities {
            h264_nvenc: false,
            hevc_nvenc: true,
        };
        assert!(caps.supports("libx264"));
        assert!(caps.supports("hevc_nvenc"));
        assert!(!caps.supports("h264_nvenc"));
    }

    #[tokio::test]
    async fn test_detect_missing_binary_is_empty() {
        let caps = EncoderCapabilities::detect(Path::new("/nonexistent/ffmpeg")).await;
        assert_eq!(caps, EncoderCapabilities::default());
    }
}
