//! QueueServer - Bounded queue, worker pool and shutdown coordination
//!
//! Producers call [`QueueServer::send`] from any task. Workers drain the
//! queue until [`QueueServer::shutdown`] broadcasts the stop signal, after
//! which the queue is sealed and every message that did not reach a worker is
//! accounted for through [`QueueServer::dropped_messages`] or
//! [`QueueServer::drain_unprocessed`].
//!
//! # Example
//!
//! ```rust,no_run
//! use courier_core::application::QueueServer;
//! use courier_core::domain::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = QueueServer::new(Config::default());
//! server.start()?;
//!
//! server.send("user_1").await?;
//!
//! server.shutdown().await;
//! let dropped = server.dropped_messages();
//! let unprocessed = server.drain_unprocessed();
//! # Ok(())
//! # }
//! ```

mod stats;

pub use stats::ServerStats;

use crate::application::bounded_queue::{BoundedQueue, PushError};
use crate::application::retry::{RetryDecision, SendRetryPolicy};
use crate::application::worker::{ShutdownSender, Worker, WorkerCounters};
use crate::domain::{Config, ConfigError, Lifecycle, SendError, ServerSettings, StartError};
use crate::port::{MessageHandler, SimulatedHandler};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle and drop accounting, guarded by a single mutex
#[derive(Debug)]
struct ServerState {
    lifecycle: Lifecycle,
    dropped: Vec<String>,
}

/// Bounded message queue server
///
/// # Thread Safety
///
/// Share with `Arc<QueueServer>`. The lifecycle/dropped-list mutex is only
/// held for a check-and-mutate step and never across an `.await`; the queue
/// is internally synchronized; no two locks are held at the same time.
///
/// Dropping a running server without calling `shutdown` releases the stop
/// signal's sender, which makes every worker exit on its next iteration.
pub struct QueueServer {
    config: Config,
    queue: Arc<BoundedQueue>,
    handler: Arc<dyn MessageHandler>,
    retry_policy: SendRetryPolicy,
    shutdown_tx: ShutdownSender,
    state: Mutex<ServerState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    drained: OnceCell<()>,
    counters: Arc<WorkerCounters>,
    accepted: AtomicU64,
}

impl QueueServer {
    /// Create a server that processes messages with the simulated handler
    pub fn new(config: Config) -> Self {
        Self::with_handler(config, Arc::new(SimulatedHandler::default()))
    }

    /// Create a server from unvalidated settings
    pub fn from_settings(settings: ServerSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(Config::try_from(settings)?))
    }

    /// Create a server with a custom message handler
    pub fn with_handler(config: Config, handler: Arc<dyn MessageHandler>) -> Self {
        let (shutdown_tx, _) = crate::application::worker::shutdown_channel();
        Self {
            queue: Arc::new(BoundedQueue::new(config.buffer_size())),
            retry_policy: SendRetryPolicy::from_config(&config),
            config,
            handler,
            shutdown_tx,
            state: Mutex::new(ServerState {
                lifecycle: Lifecycle::Created,
                dropped: Vec::new(),
            }),
            workers: Mutex::new(Vec::new()),
            drained: OnceCell::new(),
            counters: Arc::new(WorkerCounters::default()),
            accepted: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// Workers spawned and not yet exited
    pub fn active_workers(&self) -> usize {
        self.counters.active()
    }

    /// Spawn `worker_count` workers on the current tokio runtime
    ///
    /// Call exactly once, after construction and before sending. Outside a
    /// tokio runtime no worker can be spawned: the error names index 0 and the
    /// server stays `Created`.
    pub fn start(&self) -> Result<(), StartError> {
        let runtime = {
            let mut state = self.state.lock();
            if state.lifecycle != Lifecycle::Created {
                return Err(StartError::InvalidState(state.lifecycle));
            }
            // Resolved before the transition so a failure leaves the server Created
            let runtime = Handle::try_current().map_err(|e| {
                error!(worker_index = 0, error = %e, "Failed to start worker");
                StartError::WorkerSpawn {
                    index: 0,
                    reason: e.to_string(),
                }
            })?;
            state.lifecycle = Lifecycle::Running;
            runtime
        };

        let mut workers = self.workers.lock();
        // A shutdown that slipped in after the state check may already have
        // joined the (empty) worker pool; spawning now would leak workers.
        if self.shutdown_tx.is_shutdown() {
            drop(workers);
            return Err(StartError::InvalidState(self.lifecycle()));
        }

        for index in 0..self.config.worker_count() {
            let worker = Worker::new(
                index,
                Arc::clone(&self.queue),
                Arc::clone(&self.handler),
                Arc::clone(&self.counters),
            );
            let active = self.counters.enter();
            workers.push(runtime.spawn(worker.run(self.shutdown_tx.subscribe(), active)));
        }
        drop(workers);

        info!(
            workers = self.config.worker_count(),
            buffer_size = self.config.buffer_size(),
            retry_count = self.config.retry_count(),
            retry_delay_ms = %self.config.retry_delay().as_millis(),
            "Queue server started"
        );
        Ok(())
    }

    /// Enqueue a message, retrying with a fixed backoff while the queue is full
    ///
    /// # Errors
    /// - `SendError::QueueClosed` if the server was already sealed
    /// - `SendError::ShutdownInProgress` if the queue was full while shutting
    ///   down; the message is recorded as dropped
    /// - `SendError::RetryExhausted` if the queue stayed full through every
    ///   retry; the message is not recorded
    pub async fn send(&self, message: impl Into<String>) -> Result<(), SendError> {
        let mut message = message.into();
        let mut attempt: u32 = 0;
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            message = match self.try_enqueue(message)? {
                None => return Ok(()),
                Some(rejected) => rejected,
            };

            match self.retry_policy.next_attempt(attempt) {
                RetryDecision::Retry(delay) => {
                    attempt += 1;
                    debug!(
                        message = %message,
                        attempt = attempt,
                        max_retries = self.retry_policy.retry_count(),
                        "Retrying to send message"
                    );
                    // A shutdown during the backoff cuts it short; the next
                    // pass then observes the closed or stopping server.
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.wait() => {}
                    }
                }
                RetryDecision::Exhausted => {
                    warn!(message = %message, attempts = attempt, "Message rejected: retry limit reached");
                    return Err(SendError::RetryExhausted {
                        message,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    /// One non-blocking enqueue attempt.
    ///
    /// `Ok(None)` when accepted, `Ok(Some(message))` when the queue is full and
    /// a retry may follow.
    fn try_enqueue(&self, message: String) -> Result<Option<String>, SendError> {
        if self.state.lock().lifecycle.is_closed() {
            debug!(message = %message, "Send rejected: queue closed");
            return Err(SendError::QueueClosed { message });
        }

        match self.queue.try_push(message) {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::SeqCst);
                debug!("Message enqueued");
                Ok(None)
            }
            Err(PushError::Full(message)) if self.shutdown_tx.is_shutdown() => {
                warn!(message = %message, "Server is shutting down, message dropped");
                self.state.lock().dropped.push(message.clone());
                Err(SendError::ShutdownInProgress { message })
            }
            Err(PushError::Full(message)) => Ok(Some(message)),
            // Sealed between the lifecycle check and the push
            Err(PushError::Closed(message)) => {
                debug!(message = %message, "Send rejected: queue closed");
                Err(SendError::QueueClosed { message })
            }
        }
    }

    /// Stop the workers, wait for them to exit, then seal the queue
    ///
    /// Idempotent and safe to call concurrently: every caller returns only
    /// after the workers have been joined, and the join happens once.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.shutdown() {
            info!("Stop signal broadcast");
        } else {
            debug!("Stop signal already broadcast");
        }

        self.drained.get_or_init(|| self.join_workers()).await;
    }

    /// Wait for every worker to exit, then seal the queue
    ///
    /// Runs once per server. If the caller is cancelled mid-wait nothing is
    /// lost: the handles stay stored and the next `shutdown` waits again.
    async fn join_workers(&self) {
        self.state.lock().lifecycle = Lifecycle::Draining;

        self.counters.wait_idle().await;

        // Normally already finished; a `start` racing this shutdown may have
        // pushed handles for workers that are only now seeing the stop signal.
        let handles = std::mem::take(&mut *self.workers.lock());
        let joined = handles.len();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task ended abnormally");
            }
        }

        self.seal();

        info!(
            workers_joined = joined,
            dropped = self.state.lock().dropped.len(),
            unprocessed = self.queue.len(),
            "Server has shut down"
        );
    }

    /// Close the queue, then publish the closed lifecycle.
    ///
    /// In this order any push that succeeded happened before the seal, so no
    /// message is ever accepted once `Closed` is observable.
    fn seal(&self) {
        self.queue.close();
        let mut state = self.state.lock();
        if !state.lifecycle.is_closed() {
            state.lifecycle = Lifecycle::Closed;
        }
    }

    /// Messages dropped because the queue was full during shutdown
    ///
    /// Authoritative once `shutdown` has returned; earlier calls see a
    /// partial view.
    pub fn dropped_messages(&self) -> Vec<String> {
        self.state.lock().dropped.clone()
    }

    /// Remove and return messages accepted but never handed to a worker
    ///
    /// Authoritative once `shutdown` has returned; before that workers may
    /// still be consuming and the result is a partial, racy view.
    pub fn drain_unprocessed(&self) -> Vec<String> {
        let drained = self.queue.drain();
        for message in &drained {
            info!(message = %message, "Message was queued but not processed");
        }
        drained
    }

    /// Snapshot of the server counters
    pub fn stats(&self) -> ServerStats {
        let (lifecycle, dropped) = {
            let state = self.state.lock();
            (state.lifecycle, state.dropped.len())
        };
        ServerStats {
            lifecycle,
            accepted: self.accepted.load(Ordering::SeqCst),
            delivered: self.counters.delivered(),
            processed: self.counters.processed(),
            failed: self.counters.failed(),
            dropped,
            queued: self.queue.len(),
            peak_queued: self.queue.high_water_mark(),
            active_workers: self.counters.active(),
        }
    }
}

#[cfg(test)]
mod server_test;
