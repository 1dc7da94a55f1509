// Message Handler Port
// Abstraction for the work a worker performs on each dequeued message

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Fixed processing latency of the simulated handler (2s)
pub const SIMULATED_PROCESSING_LATENCY: Duration = Duration::from_secs(2);

/// Handler errors
///
/// Handler failures are logged and counted by the worker; they never reach
/// the producer that sent the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Processing failed: {0}")]
    Failed(String),
}

/// Message Handler trait
///
/// Implementations:
/// - SimulatedHandler: sleeps a fixed latency, always succeeds
/// - mocks::MockMessageHandler: scripted behaviour for tests
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process a single message
    ///
    /// # Errors
    /// - HandlerError::Failed if processing could not complete
    async fn handle(&self, message: &str) -> Result<(), HandlerError>;
}

/// Fixed-latency handler standing in for real message processing
#[derive(Debug, Clone)]
pub struct SimulatedHandler {
    latency: Duration,
}

impl SimulatedHandler {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedHandler {
    fn default() -> Self {
        Self::new(SIMULATED_PROCESSING_LATENCY)
    }
}

#[async_trait]
impl MessageHandler for SimulatedHandler {
    async fn handle(&self, message: &str) -> Result<(), HandlerError> {
        debug!(message = %message, latency_ms = %self.latency.as_millis(), "Processing message");
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Succeed after sleeping
        Delay(Duration),
    }

    /// Mock Message Handler for testing
    ///
    /// Records every message it was handed, in call order, regardless of the
    /// configured behaviour.
    #[derive(Clone)]
    pub struct MockMessageHandler {
        behavior: Arc<Mutex<MockBehavior>>,
        handled: Arc<Mutex<Vec<String>>>,
    }

    impl MockMessageHandler {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                handled: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        pub fn new_delayed(delay: Duration) -> Self {
            Self::new(MockBehavior::Delay(delay))
        }
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        pub fn call_count(&self) -> usize {
            self.handled.lock().unwrap().len()
        }
        pub fn handled(&self) -> Vec<String> {
            self.handled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageHandler for MockMessageHandler {
        async fn handle(&self, message: &str) -> Result<(), HandlerError> {
            self.handled.lock().unwrap().push(message.to_string());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(HandlerError::Failed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(())
                }
            }
        }
    }
}
