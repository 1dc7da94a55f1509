// Domain Error Types

use thiserror::Error;

use crate::domain::Lifecycle;

/// Invalid configuration, reported at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("buffer_size must be positive, got {0}")]
    BufferSize(i64),

    #[error("worker_count must be positive, got {0}")]
    WorkerCount(i64),

    #[error("retry_count cannot be negative, got {0}")]
    RetryCount(i64),

    #[error("retry_delay cannot be negative, got {0}ms")]
    RetryDelay(i64),
}

impl ConfigError {
    /// Name of the offending configuration field
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::BufferSize(_) => "buffer_size",
            ConfigError::WorkerCount(_) => "worker_count",
            ConfigError::RetryCount(_) => "retry_count",
            ConfigError::RetryDelay(_) => "retry_delay",
        }
    }
}

/// Failure to bring the worker pool up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("failed to start worker {index}: {reason}")]
    WorkerSpawn { index: usize, reason: String },

    #[error("server cannot be started from state {0}")]
    InvalidState(Lifecycle),
}

/// Outcome of a `send` that did not enqueue the message.
///
/// Every variant hands the message back so the caller can decide what to do
/// with it. Only `ShutdownInProgress` is also recorded server-side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The queue was sealed by `shutdown`; nothing was attempted.
    #[error("queue is closed, message rejected: {message}")]
    QueueClosed { message: String },

    /// The queue was full while shutdown was in progress; the server recorded
    /// the message as dropped.
    #[error("server is shutting down, message dropped: {message}")]
    ShutdownInProgress { message: String },

    /// The queue stayed full through every retry. The message was never
    /// accepted and remains the caller's.
    #[error("queue full after {attempts} retries, message rejected: {message}")]
    RetryExhausted { message: String, attempts: u32 },
}

impl SendError {
    /// The message that could not be enqueued
    pub fn message(&self) -> &str {
        match self {
            SendError::QueueClosed { message }
            | SendError::ShutdownInProgress { message }
            | SendError::RetryExhausted { message, .. } => message,
        }
    }

    /// Take back ownership of the message
    pub fn into_message(self) -> String {
        match self {
            SendError::QueueClosed { message }
            | SendError::ShutdownInProgress { message }
            | SendError::RetryExhausted { message, .. } => message,
        }
    }

    /// Whether the server kept a record of the message in its dropped list
    pub fn is_recorded_drop(&self) -> bool {
        matches!(self, SendError::ShutdownInProgress { .. })
    }
}
