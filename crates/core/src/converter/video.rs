//! Argument synthesis for video conversions.
//!
//! Order matters to ffmpeg: hardware acceleration flags go before `-i`,
//! everything else between the input and `-y <output>`.

use std::ffi::OsString;
use std::path::Path;

use super::traits::ConversionPlan;
use super::types::VideoOptions;

/// Sentinel meaning "keep whatever the source has".
const ORIGINAL: &str = "original";

/// Pass-through encoder name.
const COPY: &str = "copy";

/// Bitrate used for NVENC when advanced mode leaves it on auto.
const NVENC_AUTO_BITRATE: &str = "5000k";

/// CRF used for libx264 when advanced mode leaves the bitrate on auto.
const X264_AUTO_CRF: &str = "23";

/// Audio settings applied in simple mode.
const SIMPLE_AUDIO_ENCODER: &str = "aac";
const SIMPLE_AUDIO_BITRATE: &str = "192k";

/// Maps a software encoder name onto its NVENC counterpart.
fn nvenc_equivalent(encoder: &str) -> Option<&'static str> {
    match encoder {
        "libx264" | "h264" => Some("h264_nvenc"),
        "libx265" | "hevc" | "h265" => Some("hevc_nvenc"),
        _ => None,
    }
}

/// First whitespace-separated token, lowercased. UI labels such as
/// "1 (mono)" or "libx264 (H.264)" reduce to the value ffmpeg expects.
fn first_token(value: &str) -> String {
    value
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_unset(value: &str) -> bool {
    value.is_empty() || value == ORIGINAL
}

fn is_nvenc(encoder: &str) -> bool {
    encoder.contains("nvenc")
}

fn is_x264(encoder: &str) -> bool {
    encoder.contains("libx264")
}

impl VideoOptions {
    /// Encoder that will actually be passed to `-c:v`.
    pub fn resolve_video_encoder(&self) -> String {
        let encoder = if self.advanced || !self.format.prefers_x264() {
            first_token(&self.video_encoder)
        } else {
            "libx264".to_string()
        };

        if self.use_gpu && !self.format.is_animation() && encoder != COPY {
            if let Some(hw) = nvenc_equivalent(&encoder) {
                return hw.to_string();
            }
        }

        encoder
    }

    fn video_quality_args(&self, encoder: &str) -> Vec<String> {
        let mut args = Vec::new();
        let nvenc = is_nvenc(encoder);

        if !self.advanced {
            if nvenc {
                args.extend(["-b:v".to_string(), self.quality.nvenc_bitrate().to_string()]);
            } else {
                args.extend([
                    "-crf".to_string(),
                    self.quality.crf().to_string(),
                    "-preset".to_string(),
                    "medium".to_string(),
                ]);
            }
            return args;
        }

        let bitrate = self.video_bitrate.trim().to_ascii_lowercase();
        if !bitrate.is_empty() && bitrate != "auto" {
            let bitrate = if bitrate.chars().all(|c| c.is_ascii_digit()) {
                format!("{}k", bitrate)
            } else {
                bitrate
            };
            if bitrate.chars().any(|c| c.is_ascii_digit()) {
                args.extend(["-b:v".to_string(), bitrate.clone()]);
                if nvenc {
                    args.extend(["-maxrate".to_string(), bitrate]);
                }
            }
        } else if nvenc {
            args.extend(["-b:v".to_string(), NVENC_AUTO_BITRATE.to_string()]);
        } else if is_x264(encoder) {
            args.extend(["-crf".to_string(), X264_AUTO_CRF.to_string()]);
        }

        if is_x264(encoder) {
            let mut params = Vec::new();
            if self.ref_frames > 0 {
                params.push(format!("ref={}", self.ref_frames));
            }
            params.push(format!("cabac={}", u8::from(self.use_cabac)));
            args.extend(["-x264-params".to_string(), params.join(":")]);
        } else if nvenc && self.ref_frames > 0 {
            args.extend(["-refs".to_string(), self.ref_frames.to_string()]);
        }

        args
    }

    fn audio_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if !self.format.has_audio() {
            return args;
        }

        if !self.advanced {
            args.extend([
                "-c:a".to_string(),
                SIMPLE_AUDIO_ENCODER.to_string(),
                "-b:a".to_string(),
                SIMPLE_AUDIO_BITRATE.to_string(),
            ]);
            return args;
        }

        let encoder = first_token(&self.audio_encoder);
        if encoder == COPY {
            args.extend(["-c:a".to_string(), COPY.to_string()]);
            return args;
        }

        args.extend(["-c:a".to_string(), encoder]);

        let channels = first_token(&self.audio_channels);
        if !is_unset(&channels) {
            args.extend(["-ac".to_string(), channels]);
        }
        let samplerate = self.audio_samplerate.trim().to_ascii_lowercase();
        if !is_unset(&samplerate) {
            args.extend(["-ar".to_string(), samplerate]);
        }
        let bitrate = self.audio_bitrate.trim().to_ascii_lowercase();
        if !is_unset(&bitrate) {
            args.extend(["-b:a".to_string(), bitrate]);
        }

        args
    }
}

impl ConversionPlan for VideoOptions {
    fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut head = Vec::new();
        if self.use_gpu {
            head.extend([
                "-hwaccel".to_string(),
                "cuda".to_string(),
                "-hwaccel_output_format".to_string(),
                "cuda".to_string(),
            ]);
        }

        let mut body = Vec::new();
        if let Some(height) = self.resolution.height() {
            let filter = if self.use_gpu { "scale_cuda" } else { "scale" };
            body.extend(["-vf".to_string(), format!("{}=-2:{}", filter, height)]);
        }

        let encoder = self.resolve_video_encoder();
        let quality = if encoder == COPY {
            Vec::new()
        } else {
            self.video_quality_args(&encoder)
        };
        body.extend(["-c:v".to_string(), encoder]);
        body.extend(quality);

        if self.advanced {
            let fps = self.fps.trim().to_ascii_lowercase();
            if !is_unset(&fps) {
                body.extend(["-r".to_string(), fps]);
            }
            body.extend(self.custom_flags.split_whitespace().map(str::to_string));
        }

        body.extend(self.audio_args());
        body.push("-y".to_string());

        let mut args: Vec<OsString> = head.into_iter().map(OsString::from).collect();
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.extend(body.into_iter().map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }

    fn extension(&self) -> &'static str {
        self.format.extension()
    }

    fn probe_status(&self) -> &'static str {
        "Getting video info..."
    }
}
