// Queue Server Configuration

use crate::domain::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BUFFER_SIZE: usize = 5;
pub const DEFAULT_WORKER_COUNT: usize = 3;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Validated, immutable server configuration.
///
/// Fields are private so that every `Config` in circulation has passed
/// validation; construct with [`Config::new`] or `Config::try_from(ServerSettings)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    buffer_size: usize,
    worker_count: usize,
    retry_count: u32,
    retry_delay: Duration,
}

impl Config {
    /// Create a configuration, rejecting zero buffer size or worker count
    pub fn new(
        buffer_size: usize,
        worker_count: usize,
        retry_count: u32,
        retry_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if buffer_size == 0 {
            return Err(ConfigError::BufferSize(0));
        }
        if worker_count == 0 {
            return Err(ConfigError::WorkerCount(0));
        }
        Ok(Self {
            buffer_size,
            worker_count,
            retry_count,
            retry_delay,
        })
    }

    /// Capacity of the bounded queue
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of workers spawned by `start`
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Retries attempted by `send` while the queue is full
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Backoff between send retries
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Unvalidated settings as read from files or the environment.
///
/// Signed so that a negative value from an external source surfaces as a
/// `ConfigError` naming the field instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub buffer_size: i64,
    pub worker_count: i64,
    pub retry_count: i64,
    pub retry_delay_ms: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE as i64,
            worker_count: DEFAULT_WORKER_COUNT as i64,
            retry_count: DEFAULT_RETRY_COUNT as i64,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as i64,
        }
    }
}

impl TryFrom<ServerSettings> for Config {
    type Error = ConfigError;

    fn try_from(settings: ServerSettings) -> Result<Self, Self::Error> {
        let buffer_size = usize::try_from(settings.buffer_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::BufferSize(settings.buffer_size))?;
        let worker_count = usize::try_from(settings.worker_count)
            .ok()
            .filter(|count| *count > 0)
            .ok_or(ConfigError::WorkerCount(settings.worker_count))?;
        let retry_count = u32::try_from(settings.retry_count)
            .map_err(|_| ConfigError::RetryCount(settings.retry_count))?;
        let retry_delay_ms = u64::try_from(settings.retry_delay_ms)
            .map_err(|_| ConfigError::RetryDelay(settings.retry_delay_ms))?;

        Config::new(
            buffer_size,
            worker_count,
            retry_count,
            Duration::from_millis(retry_delay_ms),
        )
    }
}

impl From<&Config> for ServerSettings {
    fn from(config: &Config) -> Self {
        Self {
            buffer_size: config.buffer_size as i64,
            worker_count: config.worker_count as i64,
            retry_count: config.retry_count as i64,
            retry_delay_ms: config.retry_delay.as_millis() as i64,
        }
    }
}
