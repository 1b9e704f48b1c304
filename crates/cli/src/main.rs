mod cli;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use macan_core::batch::JobManager;
use macan_core::config::{load_config, validate_config, Config};
use macan_core::converter::{
    probe_duration, AudioFormat, ConversionOptions, ConversionTask, ConverterError,
    EncoderCapabilities, QualityTier, Resolution, VideoFormat, AUDIO_BITRATES,
};

use cli::{Cli, Commands, ConvertArgs};
use output::EventPrinter;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "macan.toml";

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = load(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    match cli.command {
        Commands::Convert(args) => convert(&config, args).await,
        Commands::Probe { file, json } => probe(&config, &file, json).await,
        Commands::Formats { json } => {
            formats(json);
            Ok(0)
        }
        Commands::Locate { json } => locate(&config, json).await,
    }
}

fn init_tracing(verbose: bool, log_json: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let fmt = if log_json { fmt.json().boxed() } else { fmt.boxed() };

    tracing_subscriber::registry().with(filter).with(fmt).init();
}

fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(Config::default());
            }
            fallback
        }
    };

    info!("Loading configuration from {:?}", path);
    load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

async fn convert(config: &Config, args: ConvertArgs) -> Result<i32> {
    let options = args
        .conversion_options(&config.defaults)
        .context("Invalid conversion options")?;
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| config.defaults.output_dir.clone())
        .context("No output directory given (use --output-dir or defaults.output_dir)")?;

    let binary = config.converter.locator().locate();
    match &binary {
        Some(path) => info!("Using ffmpeg at {:?}", path),
        None => warn!("{}", ConverterError::BinaryNotFound),
    }

    if let (Some(path), ConversionOptions::Video(video)) = (&binary, &options) {
        if video.use_gpu {
            let encoder = video.resolve_video_encoder();
            let caps = EncoderCapabilities::detect(path).await;
            if !caps.supports(&encoder) {
                warn!(
                    "GPU encoding requested but {} is not available in this ffmpeg build",
                    encoder
                );
            }
        }
    }

    let settings = config.converter.task_settings();
    let tasks: Vec<ConversionTask> = args
        .files
        .iter()
        .map(|file| {
            ConversionTask::new(binary.clone(), file, &output_dir, options.clone())
                .with_settings(settings)
        })
        .collect();
    let total = tasks.len();

    let manager = JobManager::new();
    let (job_id, mut events) = manager.submit(tasks);
    info!("Started job {} for {} file(s)", job_id, total);

    let mut printer = EventPrinter::new(args.json);
    let mut interrupted = false;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => printer.print(&event),
                None => break,
            },
            _ = &mut shutdown, if !interrupted => {
                warn!("Interrupted, stopping job {}", job_id);
                interrupted = true;
                if let Err(e) = manager.stop(&job_id) {
                    warn!("Failed to stop job: {}", e);
                }
            }
        }
    }

    let all_ok = matches!(printer.counts(), Some((succeeded, 0)) if succeeded == total);
    Ok(if all_ok && !interrupted { 0 } else { 1 })
}

async fn probe(config: &Config, file: &Path, json: bool) -> Result<i32> {
    let binary = config
        .converter
        .locator()
        .locate()
        .ok_or(ConverterError::BinaryNotFound)?;
    let settings = config.converter.task_settings();
    let duration = probe_duration(&binary, file, settings.probe_timeout).await;

    if json {
        println!(
            "{}",
            json!({ "file": file, "duration_secs": duration })
        );
    } else {
        match duration {
            Some(secs) => println!(
                "{}: {:02}:{:02}:{:02} ({} seconds)",
                file.display(),
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                secs
            ),
            None => println!("{}: unknown", file.display()),
        }
    }
    Ok(if duration.is_some() { 0 } else { 1 })
}

fn formats(json: bool) {
    if json {
        let video: Vec<_> = VideoFormat::ALL
            .iter()
            .map(|f| json!({ "format": f, "encoders": f.encoders(), "audio": f.has_audio() }))
            .collect();
        let resolutions: Vec<_> = Resolution::ALL.iter().map(|r| r.label()).collect();
        let qualities: Vec<_> = QualityTier::ALL.iter().map(|q| q.label()).collect();
        println!(
            "{}",
            json!({
                "audio": AudioFormat::ALL,
                "audio_bitrates": AUDIO_BITRATES,
                "video": video,
                "resolutions": resolutions,
                "qualities": qualities,
            })
        );
        return;
    }

    let audio: Vec<&str> = AudioFormat::ALL.iter().map(|f| f.extension()).collect();
    println!("Audio formats: {}", audio.join(", "));
    println!("Audio bitrates: {}", AUDIO_BITRATES.join(", "));
    println!("Video formats:");
    for format in VideoFormat::ALL {
        println!("  {:<5} encoders: {}", format, format.encoders().join(", "));
    }
    let resolutions: Vec<&str> = Resolution::ALL.iter().map(|r| r.label()).collect();
    println!("Resolutions: {}", resolutions.join(", "));
    let qualities: Vec<&str> = QualityTier::ALL.iter().map(|q| q.label()).collect();
    println!("Quality tiers: {}", qualities.join(", "));
}

async fn locate(config: &Config, json: bool) -> Result<i32> {
    let binary = config.converter.locator().locate();
    let caps = match &binary {
        Some(path) => EncoderCapabilities::detect(path).await,
        None => EncoderCapabilities::default(),
    };

    if json {
        println!("{}", json!({ "ffmpeg": binary, "capabilities": caps }));
    } else {
        match &binary {
            Some(path) => {
                println!("ffmpeg: {}", path.display());
                println!("h264_nvenc: {}", caps.h264_nvenc);
                println!("hevc_nvenc: {}", caps.hevc_nvenc);
            }
            None => println!("{}", ConverterError::BinaryNotFound),
        }
    }
    Ok(if binary.is_some() { 0 } else { 1 })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
