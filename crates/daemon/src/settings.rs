//! Layered daemon settings
//!
//! Precedence, lowest first: built-in defaults, the optional TOML file, then
//! `COURIER_*` environment variables (`COURIER_SERVER__BUFFER_SIZE`,
//! `COURIER_DEMO__PRODUCERS`, ...). Command-line flags are applied on top by
//! the caller.

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use courier_core::domain::ServerSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.courier/courier.toml";
const ENV_PREFIX: &str = "COURIER";

/// Everything the daemon reads from configuration sources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub server: ServerSettings,
    pub demo: DemoSettings,
}

/// Producer simulation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Concurrent producers, each sending one `user_<i>` message
    pub producers: usize,
    /// Delay before the daemon triggers shutdown on its own
    pub shutdown_after_ms: u64,
    /// Latency of the simulated message handler
    pub processing_latency_ms: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            producers: 10,
            shutdown_after_ms: 2_000,
            processing_latency_ms: 2_000,
        }
    }
}

impl DemoSettings {
    pub fn shutdown_after(&self) -> Duration {
        Duration::from_millis(self.shutdown_after_ms)
    }

    pub fn processing_latency(&self) -> Duration {
        Duration::from_millis(self.processing_latency_ms)
    }
}

/// Load settings from `path` (missing file is fine) and the process environment
pub fn load(path: &str) -> Result<DaemonSettings> {
    load_with_env(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_with_env(path: &str, env: Environment) -> Result<DaemonSettings> {
    let path = shellexpand::tilde(path).into_owned();

    config::Config::builder()
        .add_source(File::new(&path, FileFormat::Toml).required(false))
        .add_source(env)
        .build()
        .with_context(|| format!("Failed to read settings from {}", path))?
        .try_deserialize()
        .context("Invalid settings")
}
