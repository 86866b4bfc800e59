//! Platecheck Core - setup verification orchestration
//!
//! This crate owns the stateful part of Platecheck:
//! - Session: conversation transcript, phase machine state, per-session lock
//! - Checkpoint: checklist types, strict LLM-boundary parsing, reconciliation
//! - Engine: the two-phase LLM flow (checklist generation, image verification)
//! - Orchestrator: per-message state machine and the hardware-action gate

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod session;

pub use checkpoint::{
    Checkpoint, CheckpointResult, OverallResult, VerificationResult, Verdict,
};
pub use engine::CheckpointEngine;
pub use error::{format_error_for_chat, Error, Result};
pub use orchestrator::{
    ChatOrchestrator, ChatReply, OrchestratorConfig, SessionHistory, StartedChat,
};
pub use session::{Phase, Session, SessionStore, Turn, TurnRole};
