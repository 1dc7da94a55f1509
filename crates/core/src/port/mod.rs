// Port Layer - Interfaces for pluggable behaviour

pub mod message_handler;

// Re-exports
pub use message_handler::{HandlerError, MessageHandler, SimulatedHandler};
