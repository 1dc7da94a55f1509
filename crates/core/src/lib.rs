// Courier Core - Bounded queue server, worker pool and shutdown accounting
// NO infrastructure dependencies: config loading and logging backends live in the daemon

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{QueueServer, ServerStats};
pub use domain::{Config, ServerSettings};
pub use error::{Result, ServerError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
