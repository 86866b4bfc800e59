//! Error types for platecheck-core
//!
//! The taxonomy mirrors how failures are surfaced: model and parse problems
//! become apologetic assistant turns, tool problems are surfaced distinctly
//! (they may mean hardware the operator has to fix), validation and lookup
//! failures are request-scoped 4xx-style errors. Nothing here is fatal to
//! the process.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// LLM call failed, timed out, or returned unusable content
    #[error("model error: {0}")]
    Model(#[from] platecheck_llm::Error),

    /// LLM returned well-formed output that does not match the expected schema
    #[error("parse error: {0}")]
    Parse(String),

    /// Camera or robot call failed
    #[error("tool error: {0}")]
    Tool(#[from] platecheck_tools::Error),

    /// Invalid request input (missing protocol text, bad image index, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown session or resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the session's current phase
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Phrase an error for an assistant-visible chat turn.
pub fn format_error_for_chat(error: &Error) -> String {
    match error {
        Error::Model(_) | Error::Parse(_) => {
            "I apologize, I had trouble getting a response from the verification model. \
             Nothing was changed, so please try again."
                .to_string()
        }
        Error::Tool(e) => match e {
            platecheck_tools::Error::StatusUnknown(detail) => format!(
                "The run command was sent but I could not confirm the outcome ({}). \
                 Execution status is unknown, please verify on the robot manually.",
                detail
            ),
            other => format!(
                "A device call failed: {}. This may be a hardware problem, \
                 so please check the equipment and try again.",
                other
            ),
        },
        Error::Validation(msg) => format!("Invalid request: {}", msg),
        Error::NotFound(msg) => format!("Not found: {}", msg),
        Error::InvalidState(msg) => format!("Not possible right now: {}", msg),
    }
}
