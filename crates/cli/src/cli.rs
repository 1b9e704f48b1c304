use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use macan_core::config::DefaultsConfig;
use macan_core::converter::{
    AudioFormat, AudioOptions, ConversionOptions, ConverterError, QualityTier, Resolution,
    VideoFormat, VideoOptions,
};

#[derive(Parser)]
#[command(name = "macan")]
#[command(author, version, about = "Convert audio and video files with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "MACAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one or more files, one after another
    Convert(ConvertArgs),

    /// Print the duration of a media file
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported formats, encoders and resolutions
    Formats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which ffmpeg would be used and its hardware encoders
    Locate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Audio to audio
    Audio,
    /// Video to video
    Video,
    /// Audio track of a video
    Extract,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// What kind of conversion to run
    #[arg(short, long, value_enum, default_value = "audio")]
    pub kind: Kind,

    /// Target format, e.g. mp3 or mp4
    #[arg(short, long)]
    pub format: Option<String>,

    /// Directory for converted files (must exist)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Audio bitrate for audio and extract conversions
    #[arg(long)]
    pub bitrate: Option<String>,

    /// Output resolution: original, 360p, 480p, 720p, 1080p, 2k, 4k
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Quality tier: high, medium, low
    #[arg(long)]
    pub quality: Option<QualityTier>,

    /// Use NVIDIA hardware decoding and encoding
    #[arg(long)]
    pub gpu: bool,

    /// Honour the manual video options below
    #[arg(long)]
    pub advanced: bool,

    #[arg(long)]
    pub video_bitrate: Option<String>,

    #[arg(long)]
    pub fps: Option<String>,

    #[arg(long)]
    pub video_encoder: Option<String>,

    #[arg(long)]
    pub audio_encoder: Option<String>,

    #[arg(long)]
    pub audio_bitrate: Option<String>,

    #[arg(long)]
    pub audio_channels: Option<String>,

    #[arg(long)]
    pub audio_samplerate: Option<String>,

    /// Extra ffmpeg flags, passed through as-is
    #[arg(long, allow_hyphen_values = true)]
    pub custom_flags: Option<String>,

    #[arg(long)]
    pub ref_frames: Option<u32>,

    /// Disable x264 CABAC entropy coding
    #[arg(long)]
    pub no_cabac: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Files to convert
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl ConvertArgs {
    /// Merges command line values over the configured defaults.
    pub fn conversion_options(
        &self,
        defaults: &DefaultsConfig,
    ) -> Result<ConversionOptions, ConverterError> {
        match self.kind {
            Kind::Audio => Ok(ConversionOptions::Audio(self.audio_options(defaults)?)),
            Kind::Extract => Ok(ConversionOptions::ExtractAudio(self.audio_options(defaults)?)),
            Kind::Video => Ok(ConversionOptions::Video(self.video_options(defaults)?)),
        }
    }

    fn audio_options(&self, defaults: &DefaultsConfig) -> Result<AudioOptions, ConverterError> {
        let mut options = defaults.audio.clone();
        if let Some(format) = &self.format {
            options.format = format.parse::<AudioFormat>()?;
        }
        if let Some(bitrate) = &self.bitrate {
            options.bitrate = bitrate.clone();
        }
        Ok(options)
    }

    fn video_options(&self, defaults: &DefaultsConfig) -> Result<VideoOptions, ConverterError> {
        let mut options = defaults.video.clone();
        if let Some(format) = &self.format {
            options.format = format.parse::<VideoFormat>()?;
        }
        if let Some(resolution) = self.resolution {
            options.resolution = resolution;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        options.use_gpu |= self.gpu;
        options.advanced |= self.advanced;
        if self.no_cabac {
            options.use_cabac = false;
        }
        if let Some(refs) = self.ref_frames {
            options.ref_frames = refs;
        }

        let overrides = [
            (&self.video_bitrate, &mut options.video_bitrate),
            (&self.fps, &mut options.fps),
            (&self.video_encoder, &mut options.video_encoder),
            (&self.audio_encoder, &mut options.audio_encoder),
            (&self.audio_bitrate, &mut options.audio_bitrate),
            (&self.audio_channels, &mut options.audio_channels),
            (&self.audio_samplerate, &mut options.audio_samplerate),
            (&self.custom_flags, &mut options.custom_flags),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
        Ok(options)
    }
}
