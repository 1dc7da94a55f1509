//! Courier - Main Entry Point
//! Runs the queue server against a burst of concurrent producers, shuts it
//! down mid-flight and reports what happened to every message.

mod demo;
mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use courier_core::application::worker::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use courier_core::domain::Config;
use courier_core::port::SimulatedHandler;
use courier_core::QueueServer;
use settings::{DaemonSettings, DEFAULT_CONFIG_PATH};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Bounded message queue server demo", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML); missing file falls back to defaults
    #[arg(long, env = "COURIER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Queue capacity
    #[arg(long)]
    buffer_size: Option<i64>,

    /// Number of workers
    #[arg(long)]
    workers: Option<i64>,

    /// Send retries while the queue is full
    #[arg(long)]
    retry_count: Option<i64>,

    /// Backoff between send retries (milliseconds)
    #[arg(long)]
    retry_delay_ms: Option<i64>,

    /// Concurrent producers
    #[arg(long)]
    producers: Option<usize>,

    /// Trigger shutdown after this many milliseconds
    #[arg(long)]
    shutdown_after_ms: Option<u64>,

    /// Simulated processing time per message (milliseconds)
    #[arg(long)]
    processing_latency_ms: Option<u64>,
}

impl Cli {
    /// Flags win over file and environment
    fn apply(&self, settings: &mut DaemonSettings) {
        if let Some(v) = self.buffer_size {
            settings.server.buffer_size = v;
        }
        if let Some(v) = self.workers {
            settings.server.worker_count = v;
        }
        if let Some(v) = self.retry_count {
            settings.server.retry_count = v;
        }
        if let Some(v) = self.retry_delay_ms {
            settings.server.retry_delay_ms = v;
        }
        if let Some(v) = self.producers {
            settings.demo.producers = v;
        }
        if let Some(v) = self.shutdown_after_ms {
            settings.demo.shutdown_after_ms = v;
        }
        if let Some(v) = self.processing_latency_ms {
            settings.demo.processing_latency_ms = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging (guard flushes the optional log file on exit)
    let _log_guard = logging::init_logging()?;

    info!("Courier v{} starting...", courier_core::VERSION);

    // 2. Load configuration
    let mut settings = settings::load(&cli.config)?;
    cli.apply(&mut settings);
    let config = Config::try_from(settings.server.clone()).context("Invalid server settings")?;

    // 3. Create and start the server
    let server = Arc::new(QueueServer::with_handler(
        config,
        Arc::new(SimulatedHandler::new(settings.demo.processing_latency())),
    ));
    server.start().context("Failed to start queue server")?;

    // 4. Producers run while the shutdown timer counts down
    let producers = tokio::spawn(demo::run_producers(
        Arc::clone(&server),
        settings.demo.producers,
    ));

    tokio::select! {
        _ = tokio::time::sleep(settings.demo.shutdown_after()) => {
            info!(after_ms = settings.demo.shutdown_after_ms, "Shutdown timer elapsed");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received");
        }
    }

    // 5. Graceful shutdown
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, server.shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = GRACEFUL_SHUTDOWN_TIMEOUT.as_secs(),
            "Workers did not stop in time; reporting a partial view"
        );
    }

    let summary = producers.await.context("Producer set failed")?;
    info!(
        sent = summary.sent,
        dropped = summary.dropped,
        queue_closed = summary.queue_closed,
        retry_exhausted = summary.retry_exhausted,
        "Producers finished"
    );

    // 6. Account for every message that never reached a worker
    let stats = demo::report(&server);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    info!("Shutdown complete.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from(["courier", "--buffer-size", "2", "--producers", "4"]);
        let mut settings = DaemonSettings::default();

        cli.apply(&mut settings);

        assert_eq!(settings.server.buffer_size, 2);
        assert_eq!(settings.server.worker_count, 3);
        assert_eq!(settings.demo.producers, 4);
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
