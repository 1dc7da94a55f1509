//! Producer simulation and end-of-run accounting

use courier_core::domain::SendError;
use courier_core::{QueueServer, ServerStats};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How the producers' sends turned out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProducerSummary {
    pub sent: usize,
    pub queue_closed: usize,
    pub dropped: usize,
    pub retry_exhausted: usize,
}

impl ProducerSummary {
    fn record(&mut self, result: &Result<(), SendError>) {
        match result {
            Ok(()) => self.sent += 1,
            Err(SendError::QueueClosed { .. }) => self.queue_closed += 1,
            Err(SendError::ShutdownInProgress { .. }) => self.dropped += 1,
            Err(SendError::RetryExhausted { .. }) => self.retry_exhausted += 1,
        }
    }
}

/// Run `count` producers concurrently, each sending a single `user_<i>` message
pub async fn run_producers(server: Arc<QueueServer>, count: usize) -> ProducerSummary {
    let handles = (0..count).map(|i| {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let message = format!("user_{}", i);
            let result = server.send(message.clone()).await;
            match &result {
                Ok(()) => info!(producer = i, message = %message, "Message sent"),
                Err(e) => warn!(producer = i, error = %e, "Message not sent"),
            }
            result
        })
    });

    let mut summary = ProducerSummary::default();
    for joined in join_all(handles).await {
        match joined {
            Ok(result) => summary.record(&result),
            Err(e) => error!(error = %e, "Producer task failed"),
        }
    }
    summary
}

/// Log dropped and never-processed messages, then return final stats
///
/// Call after `shutdown` has returned; this drains the queue.
pub fn report(server: &QueueServer) -> ServerStats {
    let dropped = server.dropped_messages();
    if dropped.is_empty() {
        info!("No messages were dropped");
    }
    for message in &dropped {
        info!(message = %message, "Message was dropped");
    }

    // Snapshot before draining so `queued` still reflects leftovers
    let stats = server.stats();
    let unprocessed = server.drain_unprocessed();
    if unprocessed.is_empty() {
        info!("All queued messages were processed");
    }
    stats
}
