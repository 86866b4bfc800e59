//! Platecheck LLM - LLM provider abstraction
//!
//! This crate provides the LLM integration for Platecheck:
//! - Provider: chat provider trait definition
//! - Gemini: Google Gemini API provider (text + inline images)
//! - Util: JSON extraction and error sanitization helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod gemini;
pub mod message;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use message::{ImageData, Message, MessageRole};
pub use provider::ChatProvider;
pub use util::{extract_json, mask_api_key, truncate_safe};
