// Domain Layer - Configuration, lifecycle and error taxonomy

pub mod config;
pub mod error;
pub mod lifecycle;

// Re-exports
pub use config::{Config, ServerSettings};
pub use error::{ConfigError, SendError, StartError};
pub use lifecycle::Lifecycle;
