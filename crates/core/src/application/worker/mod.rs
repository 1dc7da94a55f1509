// Worker - Message consumption loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::bounded_queue::BoundedQueue;
use crate::port::MessageHandler;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Counters shared between the server and its workers
#[derive(Debug, Default)]
pub struct WorkerCounters {
    active: AtomicUsize,
    delivered: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    idle: Notify,
}

impl WorkerCounters {
    /// Workers currently alive (spawned and not yet exited)
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Messages handed to a worker
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Messages whose handler returned success
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Messages whose handler failed or panicked
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Wait until no worker is active
    ///
    /// Cancel-safe: dropping the future loses nothing, a later call waits again.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent last exit still wakes us
            let notified = self.idle.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Count a worker as active until the returned guard is dropped
    pub fn enter(self: &Arc<Self>) -> ActiveWorker {
        self.active.fetch_add(1, Ordering::SeqCst);
        ActiveWorker {
            counters: Arc::clone(self),
        }
    }
}

/// Keeps a worker counted as active; decrements on drop, including on panic
pub struct ActiveWorker {
    counters: Arc<WorkerCounters>,
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        if self.counters.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.counters.idle.notify_waiters();
        }
    }
}

/// Worker pulls messages off the shared queue until stopped
pub struct Worker {
    name: String,
    queue: Arc<BoundedQueue>,
    handler: Arc<dyn MessageHandler>,
    counters: Arc<WorkerCounters>,
}

impl Worker {
    pub fn new(
        index: usize,
        queue: Arc<BoundedQueue>,
        handler: Arc<dyn MessageHandler>,
        counters: Arc<WorkerCounters>,
    ) -> Self {
        Self {
            name: format!("{}-{}", WORKER_NAME_PREFIX, index),
            queue,
            handler,
            counters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run worker loop with graceful shutdown support
    ///
    /// Each iteration waits for either a message or the stop signal. The stop
    /// signal wins ties and ends the loop even if messages are still queued;
    /// those are left for `drain_unprocessed`. A message already being
    /// processed is always finished first.
    pub async fn run(self, mut shutdown: ShutdownToken, active: ActiveWorker) {
        let _active = active;
        info!(worker = %self.name, "Worker started");
        loop {
            // Check for shutdown signal
            if shutdown.is_shutdown() {
                info!(worker = %self.name, "Server shutting down, worker exiting");
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!(worker = %self.name, "Worker interrupted while idle");
                    break;
                }
                next = self.queue.pop() => match next {
                    Some(message) => self.process(message).await,
                    None => {
                        info!(worker = %self.name, "Worker exiting: queue closed");
                        break;
                    }
                },
            }
        }
        info!(worker = %self.name, "Worker stopped");
    }

    /// Hand one message to the handler
    ///
    /// The handler runs in its own task so a panic is contained: it is logged,
    /// counted as a failure, and the worker keeps going.
    async fn process(&self, message: String) {
        self.counters.delivered.fetch_add(1, Ordering::SeqCst);
        info!(worker = %self.name, message = %message, "Processing message");

        let handler = Arc::clone(&self.handler);
        let payload = message.clone();
        let handle = tokio::spawn(async move { handler.handle(&payload).await });

        match handle.await {
            Ok(Ok(())) => {
                self.counters.processed.fetch_add(1, Ordering::SeqCst);
                debug!(worker = %self.name, message = %message, "Message processed");
            }
            Ok(Err(e)) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                warn!(worker = %self.name, message = %message, error = %e, "Message handler failed");
            }
            Err(join_err) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                if join_err.is_panic() {
                    error!(worker = %self.name, message = %message, "Message handler panicked");
                } else {
                    error!(worker = %self.name, message = %message, "Message handler cancelled");
                }
            }
        }
    }
}
