// Send retry logic
use crate::domain::Config;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given backoff
    Retry(Duration),
    /// Retry budget spent, give the message back
    Exhausted,
}

/// Retry policy for `send` while the queue is full
///
/// Determines whether another enqueue attempt is allowed based on:
/// - Attempts already made
/// - Maximum retries from `Config::retry_count`
///
/// The backoff is a constant `Config::retry_delay`; it does not grow.
#[derive(Debug, Clone)]
pub struct SendRetryPolicy {
    retry_count: u32,
    retry_delay: Duration,
}

impl SendRetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `retry_count` - Retries allowed after the first attempt
    /// * `retry_delay` - Sleep between attempts
    pub fn new(retry_count: u32, retry_delay: Duration) -> Self {
        Self {
            retry_count,
            retry_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry_count(), config.retry_delay())
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Decide what to do after `attempt` retries have already been spent
    ///
    /// # Example
    /// ```text
    /// match policy.next_attempt(attempt) {
    ///     RetryDecision::Retry(delay) => sleep(delay).await,
    ///     RetryDecision::Exhausted => return Err(..),
    /// }
    /// ```
    pub fn next_attempt(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.retry_count {
            warn!(
                attempts = %attempt,
                max_retries = %self.retry_count,
                "Send retry limit reached"
            );
            return RetryDecision::Exhausted;
        }

        debug!(
            attempt = %(attempt + 1),
            max_retries = %self.retry_count,
            delay_ms = %self.retry_delay.as_millis(),
            "Queue full, scheduling send retry"
        );
        RetryDecision::Retry(self.retry_delay)
    }
}
