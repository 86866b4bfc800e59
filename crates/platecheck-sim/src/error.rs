//! Error types for platecheck-sim

use thiserror::Error;

/// Simulator error type
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected simulation parameters
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Unknown experiment id
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
