//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ConverterError;

/// Audio bitrates offered to users. Any other string is still passed through.
pub const AUDIO_BITRATES: &[&str] = &["96k", "128k", "192k", "256k", "320k"];

/// Audio output format (the target file extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG Audio Layer III
    Mp3,
    /// WAVE (uncompressed)
    Wav,
    /// Raw ADTS AAC
    Aac,
    /// Free Lossless Audio Codec
    Flac,
    /// Ogg container
    Ogg,
    /// MPEG-4 audio
    M4a,
}

impl AudioFormat {
    /// All supported audio formats, in display order.
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::Wav,
        Self::Aac,
        Self::Flac,
        Self::Ogg,
        Self::M4a,
    ];

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| ConverterError::UnsupportedFormat {
                format: s.to_string(),
            })
    }
}

/// Video output format (the target container extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// MPEG-4 Part 14
    Mp4,
    /// Matroska
    Mkv,
    /// Audio Video Interleave
    Avi,
    /// QuickTime
    Mov,
    /// WebM
    Webm,
    /// Animated GIF (no audio stream)
    Gif,
}

impl VideoFormat {
    /// All supported video formats, in display order.
    pub const ALL: [VideoFormat; 6] = [
        Self::Mp4,
        Self::Mkv,
        Self::Avi,
        Self::Mov,
        Self::Webm,
        Self::Gif,
    ];

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::Webm => "webm",
            Self::Gif => "gif",
        }
    }

    /// Video encoders selectable for this container. The first is the default.
    pub fn encoders(&self) -> &'static [&'static str] {
        match self {
            Self::Mp4 | Self::Mkv | Self::Mov => &["libx264", "libx265", "copy"],
            Self::Avi => &["mpeg4", "copy"],
            Self::Webm => &["libvpx-vp9", "copy"],
            Self::Gif => &["gif"],
        }
    }

    /// Default video encoder for this container.
    pub fn default_encoder(&self) -> &'static str {
        self.encoders()[0]
    }

    /// Pure animation/image-sequence target.
    pub fn is_animation(&self) -> bool {
        matches!(self, Self::Gif)
    }

    /// Whether the container carries an audio stream at all.
    pub fn has_audio(&self) -> bool {
        !self.is_animation()
    }

    /// Whether simple mode pins the encoder to libx264 for this container.
    pub(crate) fn prefers_x264(&self) -> bool {
        matches!(self, Self::Mp4 | Self::Mov | Self::Mkv)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for VideoFormat {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| ConverterError::UnsupportedFormat {
                format: s.to_string(),
            })
    }
}

/// Target output resolution. Width always follows the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "2k")]
    K2,
    #[serde(rename = "4k")]
    K4,
}

impl Resolution {
    pub const ALL: [Resolution; 7] = [
        Self::Original,
        Self::P360,
        Self::P480,
        Self::P720,
        Self::P1080,
        Self::K2,
        Self::K4,
    ];

    /// Label as shown to users and accepted by `FromStr`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::K2 => "2k",
            Self::K4 => "4k",
        }
    }

    /// Output height in pixels, or `None` to keep the source size.
    pub fn height(&self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::P360 => Some(360),
            Self::P480 => Some(480),
            Self::P720 => Some(720),
            Self::P1080 => Some(1080),
            Self::K2 => Some(1440),
            Self::K4 => Some(2160),
        }
    }
}

impl FromStr for Resolution {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| ConverterError::InvalidOption {
                reason: format!("unknown resolution '{}'", s),
            })
    }
}

/// Quality tier used when advanced mode is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    High,
    #[default]
    Medium,
    Low,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Constant rate factor for software encoders.
    pub fn crf(&self) -> &'static str {
        match self {
            Self::High => "18",
            Self::Medium => "23",
            Self::Low => "28",
        }
    }

    /// Target bitrate for NVENC encoders.
    pub fn nvenc_bitrate(&self) -> &'static str {
        match self {
            Self::High => "6000k",
            Self::Medium => "4000k",
            Self::Low => "2000k",
        }
    }
}

impl FromStr for QualityTier {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ConverterError::InvalidOption {
                reason: format!("unknown quality tier '{}'", s),
            }),
        }
    }
}

/// Options for an audio conversion (also used for audio extraction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOptions {
    /// Target audio format.
    pub format: AudioFormat,
    /// Target bitrate, e.g. "192k".
    pub bitrate: String,
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mp3,
            bitrate: default_audio_bitrate(),
        }
    }
}

/// Options for a video conversion.
///
/// When `advanced` is false only `format`, `resolution`, `quality` and
/// `use_gpu` matter; every manual field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    /// Target container.
    pub format: VideoFormat,
    /// Output resolution.
    pub resolution: Resolution,
    /// Simple-mode quality tier.
    pub quality: QualityTier,
    /// Use NVIDIA hardware decoding/encoding.
    pub use_gpu: bool,
    /// Honour the manual fields below.
    pub advanced: bool,
    /// "auto", a bare integer (kbps) or an ffmpeg rate like "5m".
    pub video_bitrate: String,
    /// "original" or a frame rate.
    pub fps: String,
    /// Video encoder name, e.g. "libx264" or "copy".
    pub video_encoder: String,
    /// Audio encoder name, e.g. "aac" or "copy".
    pub audio_encoder: String,
    /// "original" or an ffmpeg rate like "192k".
    pub audio_bitrate: String,
    /// "original" or a channel count.
    pub audio_channels: String,
    /// "original" or a sample rate in Hz.
    pub audio_samplerate: String,
    /// Extra ffmpeg flags, split on whitespace.
    pub custom_flags: String,
    /// Reference frames, 0 lets the encoder decide.
    pub ref_frames: u32,
    /// x264 CABAC entropy coding.
    pub use_cabac: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            format: VideoFormat::Mp4,
            resolution: Resolution::Original,
            quality: QualityTier::Medium,
            use_gpu: false,
            advanced: false,
            video_bitrate: "auto".to_string(),
            fps: "original".to_string(),
            video_encoder: "libx264".to_string(),
            audio_encoder: "aac".to_string(),
            audio_bitrate: "original".to_string(),
            audio_channels: "original".to_string(),
            audio_samplerate: "original".to_string(),
            custom_flags: String::new(),
            ref_frames: 0,
            use_cabac: true,
        }
    }
}

/// Conversion options, one case per kind of job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionOptions {
    /// Audio to audio.
    Audio(AudioOptions),
    /// Video to video.
    Video(VideoOptions),
    /// Audio track of a video file. ffmpeg takes video input transparently
    /// once the video stream is dropped, so the audio arguments apply as is.
    ExtractAudio(AudioOptions),
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::Audio(AudioOptions::default())
    }
}

/// A progress report for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0..=100. Only the final report of a successful task reaches 100.
    pub percent: u8,
    /// Human readable status line.
    pub status: String,
}

impl ProgressEvent {
    pub fn new(percent: u8, status: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            status: status.into(),
        }
    }
}

/// Terminal outcome of a conversion task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Message suitable for direct display.
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded => "Conversion complete.".to_string(),
            Self::Failed(message) => message.clone(),
            Self::Cancelled => ConverterError::Cancelled.to_string(),
        }
    }
}

impl From<ConverterError> for TaskOutcome {
    fn from(err: ConverterError) -> Self {
        match err {
            ConverterError::Cancelled => Self::Cancelled,
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Event emitted by a running task, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Progress(ProgressEvent),
    Done { success: bool, message: String },
}

/// Lifecycle state of a conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl From<&TaskOutcome> for TaskState {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Succeeded => Self::Succeeded,
            TaskOutcome::Failed(_) => Self::Failed,
            TaskOutcome::Cancelled => Self::Cancelled,
        }
    }
}
