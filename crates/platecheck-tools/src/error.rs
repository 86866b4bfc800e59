//! Error types for platecheck-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool execution failed on the server side
    #[error("execution failed: {0}")]
    Execution(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Server returned a JSON-RPC error object
    #[error("server error {code}: {message}")]
    Server {
        /// Error code
        code: i32,
        /// Error message
        message: String,
    },

    /// Hardware/device problem reported by the tool server
    #[error("device error: {0}")]
    Device(String),

    /// The command was dispatched but the outcome could not be confirmed.
    /// Callers must treat this as unknown state, never as success.
    #[error("execution status unknown: {0}")]
    StatusUnknown(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
