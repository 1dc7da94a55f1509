// Server statistics snapshot

use crate::domain::Lifecycle;
use serde::Serialize;

/// Point-in-time counters for a queue server
///
/// Once `shutdown` has returned and before `drain_unprocessed` runs:
/// `accepted == delivered + queued` and `delivered == processed + failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub lifecycle: Lifecycle,
    /// Messages successfully enqueued by `send`
    pub accepted: u64,
    /// Messages handed to a worker
    pub delivered: u64,
    /// Messages whose handler succeeded
    pub processed: u64,
    /// Messages whose handler failed or panicked
    pub failed: u64,
    /// Messages recorded as dropped during shutdown
    pub dropped: usize,
    /// Messages currently buffered
    pub queued: usize,
    /// Highest buffer occupancy observed
    pub peak_queued: usize,
    pub active_workers: usize,
}
