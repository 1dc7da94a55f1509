// Worker constants (no magic values)
use std::time::Duration;

/// Grace period a daemon gives `shutdown` before giving up on the join (30s)
/// Covers one in-flight message at the simulated 2s latency with wide margin
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix used in worker log fields and task names
pub const WORKER_NAME_PREFIX: &str = "courier-worker";
