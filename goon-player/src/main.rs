//! goon player - console entry point
//!
//! Reads `<session> <command>` lines from stdin, drives one playback session
//! per session id, and prints player events as they are published. Media is
//! looked up with yt-dlp; streaming is simulated.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use goon_common::config::{resolve_log_level, TomlConfig};
use goon_common::events::EventBus;
use goon_player::console::{execute, parse_command, render_event, Input, ParseError, USAGE};
use goon_player::monitor::start_progress_sweep;
use goon_player::playback::{SessionDeps, SessionSettings, SimulatedTransport, Transport};
use goon_player::publisher::ViewPublisher;
use goon_player::resolver::{RetryPolicy, RetryingResolver, YtDlpResolver};
use goon_player::SessionRegistry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Broadcast buffer for player events
const EVENT_CAPACITY: usize = 256;

/// Command-line arguments for goon-player
#[derive(Parser, Debug)]
#[command(name = "goon-player")]
#[command(about = "Per-session media playback scheduler with a console front end")]
#[command(version)]
struct Args {
    /// Path to config file (overrides GOON_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides GOON_LOG_LEVEL)
    #[arg(short, long)]
    log_level: Option<String>,

    /// yt-dlp executable (overrides [resolver].ytdlp_path)
    #[arg(long)]
    ytdlp_path: Option<String>,

    /// Simulated play time in seconds for items of unknown duration
    #[arg(long, default_value = "30")]
    fallback_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load_resolved(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(path) = args.ytdlp_path {
        config.resolver.ytdlp_path = path;
    }

    let level = resolve_log_level(args.log_level.as_deref(), &config.logging);
    init_tracing(&level, config.logging.file.as_deref())?;

    info!(
        ytdlp = %config.resolver.ytdlp_path,
        max_attempts = config.resolver.max_attempts,
        retry_delay_ms = config.resolver.retry_delay_ms,
        progress_interval_ms = config.playback.progress_interval_ms,
        "Starting goon player"
    );

    let bus = EventBus::new(EVENT_CAPACITY);
    let publisher: Arc<dyn ViewPublisher> = Arc::new(bus.clone());

    let resolver = Arc::new(RetryingResolver::new(
        Arc::new(YtDlpResolver::new(&config.resolver)),
        RetryPolicy::from(&config.resolver),
    ));
    let transport: Arc<dyn Transport> = Arc::new(SimulatedTransport::new(Duration::from_secs(
        args.fallback_secs.max(1),
    )));

    let registry = Arc::new(SessionRegistry::new(SessionDeps {
        resolver,
        transport,
        publisher: publisher.clone(),
        settings: SessionSettings::from(&config.playback),
    }));

    let cancel = CancellationToken::new();
    let sweep = start_progress_sweep(
        registry.clone(),
        publisher,
        Duration::from_millis(config.playback.progress_interval_ms),
        cancel.clone(),
    );
    let renderer = tokio::spawn(render_events(bus.subscribe(), cancel.clone()));

    println!("{}", USAGE);
    let result = run_console(&registry, config.playback.queue_display_limit).await;

    info!("Shutting down");
    registry.shutdown_all().await;
    cancel.cancel();
    if let Err(e) = sweep.await {
        warn!(error = %e, "Progress sweep task ended abnormally");
    }
    if let Err(e) = renderer.await {
        warn!(error = %e, "Event renderer task ended abnormally");
    }

    info!("Shutdown complete");
    result
}

/// Console reader loop; returns on `quit`, end of input, or a shutdown signal
async fn run_console(registry: &SessionRegistry, queue_limit: usize) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            info!("Input closed");
            break;
        };

        match parse_command(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Help) => println!("{}", USAGE),
            Ok(Input::Sessions) => {
                let ids = registry.list_active().await;
                if ids.is_empty() {
                    println!("No active sessions.");
                } else {
                    println!("{}", ids.join(", "));
                }
            }
            Ok(Input::Session {
                session_id,
                command,
            }) => {
                println!("{}", execute(registry, &session_id, command, queue_limit).await);
            }
            Err(ParseError::Empty) => {}
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}

/// Print published events until cancelled
async fn render_events(mut rx: broadcast::Receiver<goon_common::PlayerEvent>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(event) => {
                if let Some(line) = render_event(&event) {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event renderer lagging, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Initialize tracing: stderr, plus an optional plain-text log file
///
/// RUST_LOG, when set, takes precedence over the resolved level.
fn init_tracing(level: &str, file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("goon_player={level},goon_common={level}").into());

    let file_layer = match file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
