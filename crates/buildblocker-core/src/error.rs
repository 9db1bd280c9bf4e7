//! Error types for the build blocker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Queue errors
    #[error("Queue item not found: {0}")]
    QueueItemNotFound(String),

    #[error("Invalid queue transition for {item}: {from} -> {to}")]
    InvalidTransition {
        item: String,
        from: String,
        to: String,
    },

    #[error("Invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    // Build errors
    #[error("Build not found: {0}")]
    BuildNotFound(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
