//! Session state and the in-memory session store
//!
//! A session is the unit of isolation: its turns are append-only, its phase
//! is the orchestrator state machine, and its per-session mutex serializes
//! turn processing. A message arriving while another is in flight queues on
//! the lock in arrival order, since the model context is order-sensitive.
//! Sessions are never deleted; the store lives for the process lifetime.

use crate::checkpoint::{Checkpoint, VerificationResult};
use chrono::{DateTime, Utc};
use platecheck_llm::Message;
use platecheck_tools::CapturedImage;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Orchestrator phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Checklist being generated from the protocol
    Analyzing,
    /// Checklist delivered, waiting for the operator to declare readiness
    AwaitingSetup,
    /// Camera capture + verification in flight
    Verifying,
    /// Robot run being dispatched
    Executing,
    /// Protocol run started; terminal
    Done,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Operator message
    User,
    /// Assistant reply
    Assistant,
    /// System notice
    System,
}

/// One entry in the conversation transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Who produced the turn
    pub role: TurnRole,
    /// Turn text
    pub content: String,
    /// Index into the session's captured images, if a photo was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    /// Verification payload attached to this turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    /// Action tag (photo_taken, protocol_executed, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Plain user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            image_index: None,
            verification: None,
            action: None,
            timestamp: Utc::now(),
        }
    }

    /// Plain assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            image_index: None,
            verification: None,
            action: None,
            timestamp: Utc::now(),
        }
    }
}

/// Per-session state.
#[derive(Debug)]
pub struct Session {
    /// Session id
    pub id: Uuid,
    /// Display name of the uploaded protocol
    pub protocol_name: String,
    /// Full protocol source text
    pub protocol_text: String,
    /// Current phase
    pub phase: Phase,
    /// Conversation transcript, append-only
    pub turns: Vec<Turn>,
    /// Checklist generated at session start (empty if generation degraded)
    pub checklist: Vec<Checkpoint>,
    /// Model conversation context (verification thread)
    pub context: Vec<Message>,
    /// Model conversation context (free-form chat thread)
    pub chat_context: Vec<Message>,
    /// Photos captured during this session
    pub images: Vec<CapturedImage>,
    /// Set before the robot run is dispatched; never issue a second run
    pub executed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session in the `Analyzing` phase.
    #[must_use]
    pub fn new(protocol_name: impl Into<String>, protocol_text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            protocol_name: protocol_name.into(),
            protocol_text: protocol_text.into(),
            phase: Phase::Analyzing,
            turns: Vec::new(),
            checklist: Vec::new(),
            context: Vec::new(),
            chat_context: Vec::new(),
            images: Vec::new(),
            executed: false,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Append a turn and bump the activity timestamp.
    pub fn push_turn(&mut self, turn: Turn) {
        self.last_active_at = turn.timestamp;
        self.turns.push(turn);
    }

    /// Store a captured image, returning its index.
    pub fn push_image(&mut self, image: CapturedImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }
}

/// In-memory session store with per-key serialization.
///
/// The outer `RwLock` only guards the map; each session carries its own
/// `Mutex` so one session's turn-processing never blocks another session.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a session, returning its handle.
    pub async fn insert(&self, session: Session) -> Arc<Mutex<Session>> {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    /// Look up a session by id.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session {} not found", id)))
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
