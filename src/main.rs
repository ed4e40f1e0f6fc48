use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sysinfo::System;

use color_sentinel::config::APP_DIR_NAME;
use color_sentinel::{
    AppResult, Event, EventBus, ImageSequenceSource, Pipeline, SentinelConfig, SentinelRunner,
};

const LOG_TARGET_STARTUP: &str = "color_sentinel::startup";

#[derive(Parser, Debug)]
#[command(name = "color-sentinel", version, about = "Watch a frame stream for persistent colored regions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a directory of frames and print one JSON line per event
    Run {
        /// Directory of png/jpg/bmp frames, played back in filename order
        #[arg(long)]
        frames: PathBuf,

        #[command(flatten)]
        config: ConfigArg,

        /// Frame rate used to timestamp frames
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Log a per-stage latency report at the end
        #[arg(long)]
        report: bool,
    },
    /// Write the default configuration
    InitConfig {
        #[command(flatten)]
        config: ConfigArg,
    },
    /// Validate a configuration file
    CheckConfig {
        #[command(flatten)]
        config: ConfigArg,
    },
}

#[derive(Args, Debug)]
struct ConfigArg {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArg {
    fn resolve(&self) -> AppResult<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(SentinelConfig::default_path()?),
        }
    }
}

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - macOS: ~/Library/Application Support/ColorSentinel/logs/
/// - Windows: %APPDATA%/ColorSentinel/logs/
/// - Linux: ~/.config/ColorSentinel/logs/
///
/// Debug builds also log to stderr; stdout carries event output only.
fn initialize_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "color-sentinel.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
    guard
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let architecture = std::env::consts::ARCH;

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting Color Sentinel v{} on ({})", version, architecture);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Worker threads: {}",
        rayon::current_num_threads()
    );
}

fn run(frames: &Path, config_path: &Path, fps: f64, report: bool) -> AppResult<()> {
    let config = SentinelConfig::load_or_create(config_path)
        .with_context(|| format!("Loading {}", config_path.display()))?;
    let pipeline = Pipeline::new(config).context("Building pipeline")?;
    let mut source = ImageSequenceSource::open(frames, fps)
        .with_context(|| format!("Opening {}", frames.display()))?;

    let bus = EventBus::new();
    let rx = bus.subscribe();

    let printer = thread::spawn(move || -> AppResult<()> {
        while let Ok(event) = rx.recv() {
            match event {
                Event::Sentinel(e) => println!("{}", serde_json::to_string(&e)?),
                Event::FrameRejected { index, reason } => {
                    tracing::warn!("Frame {} rejected: {}", index, reason)
                }
                Event::PipelineReset { reason } => tracing::info!("Pipeline reset: {}", reason),
                Event::StreamFinished { .. } => break,
            }
        }
        Ok(())
    });

    let mut runner = SentinelRunner::new(pipeline, bus);
    let result = runner.run(&mut source);

    match printer.join() {
        Ok(printed) => printed?,
        Err(_) => anyhow::bail!("Event printer thread panicked"),
    }

    if report {
        runner.stats().log_report();
    }

    let summary = result?;
    eprintln!(
        "{} frames, {} events ({} rejected, {} resets)",
        summary.frames, summary.events, summary.rejected, summary.resets
    );
    Ok(())
}

fn init_config(path: &Path) -> AppResult<()> {
    SentinelConfig::default()
        .save(path)
        .with_context(|| format!("Writing {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn check_config(path: &Path) -> AppResult<()> {
    SentinelConfig::load(path)?;
    println!("{} is valid", path.display());
    Ok(())
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let _guard = initialize_tracing();
    log_runtime_environment();

    match cli.command {
        Command::Run {
            frames,
            config,
            fps,
            report,
        } => run(&frames, &config.resolve()?, fps, report),
        Command::InitConfig { config } => init_config(&config.resolve()?),
        Command::CheckConfig { config } => check_config(&config.resolve()?),
    }
}
