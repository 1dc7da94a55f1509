// Central Error Type for the Server

use thiserror::Error;

/// Umbrella error for callers that drive the whole server lifecycle
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::domain::ConfigError),

    #[error("Start error: {0}")]
    Start(#[from] crate::domain::StartError),

    #[error("Send error: {0}")]
    Send(#[from] crate::domain::SendError),

    #[error("Handler error: {0}")]
    Handler(#[from] crate::port::HandlerError),
}

/// Result type alias using ServerError
pub type Result<T> = std::result::Result<T, ServerError>;
