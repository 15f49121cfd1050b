//! Barrage - replays captured live-stream traffic and prints room events.
//!
//! Reads a capture file recorded by the interception proxy (one JSON frame
//! per line), runs every frame through the pipeline and prints each decoded
//! event, either as a one-line summary or as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use barrage_core::PackMsgType;
use barrage_grab::{BarrageGrab, EventRecord, GrabConfig, GrabEvent, ReplayCapture};
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Barrage - decode captured live-stream traffic into room events
#[derive(Parser, Debug)]
#[command(name = "barrage", version, about)]
struct Args {
    /// Capture file to replay (JSON lines)
    capture: PathBuf,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Additional process to accept frames from (repeatable)
    #[arg(long = "process")]
    processes: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Print pipeline counters when done
    #[arg(long)]
    stats: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "barrage", "Barrage").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
///
/// Logs go to stderr so stdout carries only events.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "barrage={0},barrage_core={0},barrage_grab={0},warn",
            log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("barrage")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stderr))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Loads the configuration and applies command-line overrides.
fn load_config(path: Option<&Path>, processes: &[String]) -> anyhow::Result<GrabConfig> {
    let mut config = match path {
        Some(path) => GrabConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GrabConfig::load_or_default().context("failed to load config")?,
    };

    for process in processes {
        if !config.process_filter.contains(process) {
            config.process_filter.push(process.clone());
        }
    }

    Ok(config)
}

/// Returns the printable kind of an event, if it has one.
fn print_kind(event: &GrabEvent) -> Option<PackMsgType> {
    event.to_pack_event().map(|e| e.kind())
}

/// Returns true if the configuration asks for this event to be printed.
fn should_print(config: &GrabConfig, event: &GrabEvent) -> bool {
    print_kind(event).is_some_and(|kind| config.prints(kind))
}

/// Formats an event for output.
fn render(event: &GrabEvent, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string(&EventRecord::from(event))?)
    } else {
        Ok(event.summary())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    let config = load_config(args.config.as_deref(), &args.processes)?;
    let print_config = config.clone();

    let capture = Arc::new(
        ReplayCapture::from_file(&args.capture)
            .with_context(|| format!("failed to read capture {}", args.capture.display()))?,
    );
    tracing::info!(
        "Replaying {} frames from {}",
        capture.pending(),
        args.capture.display()
    );

    let grab = BarrageGrab::builder()
        .with_config(config)
        .with_capture(capture.clone())
        .build()?;

    let json = args.json;
    grab.dispatcher().on_any(move |event| {
        if !should_print(&print_config, event) {
            return;
        }
        match render(event, json) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Failed to render event: {}", e),
        }
    });

    grab.start()?;
    let delivered = capture.replay();
    grab.dispose();

    let stats = grab.stats();
    tracing::info!(
        "Replayed {} frames, emitted {} events",
        delivered,
        stats.events_emitted
    );
    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
