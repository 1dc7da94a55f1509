//! Tracing subscriber setup
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `courier=info`)
//! - `COURIER_LOG_FORMAT`: `json` for structured output, anything else for pretty
//! - `COURIER_LOG_DIR`: also write JSON logs to a daily-rolling file in this directory

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "courier=info";
const LOG_FILE_PREFIX: &str = "courier.log";

/// Install the global subscriber
///
/// Logs go to stderr so stdout carries only the final stats report. The
/// returned guard flushes the log file on drop; hold it until exit.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("COURIER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("Failed to create env filter")?;

    let (file_layer, guard) = match std::env::var("COURIER_LOG_DIR") {
        Ok(dir) => {
            let dir = shellexpand::tilde(&dir).into_owned();
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    let installed = match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
        }
    };
    installed.context("Failed to install tracing subscriber")?;

    Ok(guard)
}
