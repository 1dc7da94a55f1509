// Application Layer - Queue, workers and server coordination

pub mod bounded_queue;
pub mod retry;
pub mod server;
pub mod worker;

// Re-exports
pub use bounded_queue::{BoundedQueue, PushError};
pub use retry::{RetryDecision, SendRetryPolicy};
pub use server::{QueueServer, ServerStats};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerCounters};
