//! Per-message orchestration: the session state machine
//!
//! The orchestrator decides what each operator message triggers. Hardware
//! actions are gated by a deterministic keyword check on the operator's own
//! words; the model never decides to take a photo or start a run. The
//! pipeline for a readiness declaration is fixed: photo, verification, and
//! only on a full pass a single robot dispatch.

use crate::checkpoint::{Checkpoint, VerificationResult};
use crate::engine::CheckpointEngine;
use crate::error::{format_error_for_chat, Error, Result};
use crate::prompts;
use crate::session::{Phase, Session, SessionStore, Turn, TurnRole};
use chrono::Utc;
use platecheck_llm::{ChatProvider, CompletionRequest, ImageData, Message};
use platecheck_tools::{Camera, CapturedImage, RobotRunner};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Default phrases that count as a readiness declaration.
///
/// Deliberately excludes "setup"/"set up": questions about the setup
/// ("what do I need to set up?") must stay conversational.
const DEFAULT_READINESS_KEYWORDS: &[&str] = &["done", "ready", "finished", "完了", "完成"];

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model name for all LLM calls; empty means the provider default
    pub model: String,
    /// Case-insensitive substrings that declare the setup complete
    pub readiness_keywords: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            readiness_keywords: DEFAULT_READINESS_KEYWORDS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Outcome of starting a session.
#[derive(Debug)]
pub struct StartedChat {
    /// New session id
    pub session_id: Uuid,
    /// Opening assistant message
    pub greeting: String,
    /// Generated checklist (empty if generation degraded)
    pub checklist: Vec<Checkpoint>,
}

/// Outcome of handling one operator message.
#[derive(Debug)]
pub struct ChatReply {
    /// Assistant reply text
    pub reply: String,
    /// Session phase after this message
    pub phase: Phase,
    /// Verification result, when this message triggered one
    pub verification: Option<VerificationResult>,
    /// Index of a photo captured during this message
    pub image_index: Option<usize>,
    /// Action tag (photo_taken, protocol_executed)
    pub action: Option<String>,
    /// Whether the robot run has been dispatched for this session
    pub executed: bool,
}

/// Transcript snapshot for a session.
#[derive(Debug, serde::Serialize)]
pub struct SessionHistory {
    /// Session id
    pub session_id: Uuid,
    /// Protocol display name
    pub protocol_name: String,
    /// Current phase
    pub phase: Phase,
    /// Whether the robot run has been dispatched
    pub executed: bool,
    /// Full transcript in arrival order
    pub turns: Vec<Turn>,
}

/// Session orchestrator. One instance serves all sessions.
pub struct ChatOrchestrator {
    provider: Arc<dyn ChatProvider>,
    engine: CheckpointEngine,
    camera: Arc<dyn Camera>,
    robot: Arc<dyn RobotRunner>,
    sessions: SessionStore,
    model: String,
    readiness_keywords: Vec<String>,
}

impl ChatOrchestrator {
    /// Wire up an orchestrator from its collaborators.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        camera: Arc<dyn Camera>,
        robot: Arc<dyn RobotRunner>,
        config: OrchestratorConfig,
    ) -> Self {
        let model = if config.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.model
        };
        Self {
            engine: CheckpointEngine::new(provider.clone(), model.clone()),
            provider,
            camera,
            robot,
            sessions: SessionStore::new(),
            model,
            readiness_keywords: config.readiness_keywords,
        }
    }

    /// Start a session from an uploaded protocol script.
    ///
    /// Checklist generation and the greeting each degrade independently: a
    /// model failure leaves the checklist empty (verification will refuse
    /// later) or substitutes a canned greeting, but the session always opens.
    pub async fn start_session(
        &self,
        protocol_name: &str,
        protocol_text: &str,
    ) -> Result<StartedChat> {
        if protocol_text.trim().is_empty() {
            return Err(Error::Validation("protocol text is empty".to_string()));
        }

        let mut session = Session::new(protocol_name, protocol_text);
        let session_id = session.id;
        info!(%session_id, protocol = protocol_name, "starting session");

        match self
            .engine
            .generate_checklist(protocol_text, &mut session.context)
            .await
        {
            Ok(checklist) => session.checklist = checklist,
            Err(e) => {
                warn!(%session_id, error = %e, "checklist generation failed, session degrades");
            }
        }

        let greeting = match self
            .chat(&mut session.chat_context, prompts::greeting_prompt(protocol_text))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%session_id, error = %e, "greeting generation failed, using fallback");
                prompts::FALLBACK_GREETING.to_string()
            }
        };

        session.push_turn(Turn::assistant(greeting.clone()));
        session.phase = Phase::AwaitingSetup;
        let checklist = session.checklist.clone();
        self.sessions.insert(session).await;

        Ok(StartedChat {
            session_id,
            greeting,
            checklist,
        })
    }

    /// Handle one operator message.
    ///
    /// Messages for the same session are processed strictly in arrival order;
    /// the per-session lock is held for the whole turn.
    pub async fn handle_message(&self, session_id: Uuid, text: &str) -> Result<ChatReply> {
        if text.trim().is_empty() {
            return Err(Error::Validation("message text is empty".to_string()));
        }

        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        session.push_turn(Turn::user(text));

        let reply = if self.declares_readiness(text) {
            self.run_verification_pipeline(&mut session).await
        } else {
            self.free_form_reply(&mut session, text).await
        };

        session.push_turn(Turn {
            role: TurnRole::Assistant,
            content: reply.reply.clone(),
            image_index: reply.image_index,
            verification: reply.verification.clone(),
            action: reply.action.clone(),
            timestamp: Utc::now(),
        });
        Ok(reply)
    }

    /// Transcript snapshot for a session.
    pub async fn history(&self, session_id: Uuid) -> Result<SessionHistory> {
        let handle = self.sessions.get(session_id).await?;
        let session = handle.lock().await;
        Ok(SessionHistory {
            session_id: session.id,
            protocol_name: session.protocol_name.clone(),
            phase: session.phase,
            executed: session.executed,
            turns: session.turns.clone(),
        })
    }

    /// Fetch a captured image by index.
    pub async fn image(&self, session_id: Uuid, index: usize) -> Result<CapturedImage> {
        let handle = self.sessions.get(session_id).await?;
        let session = handle.lock().await;
        session
            .images
            .get(index)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("image {} not found", index)))
    }

    /// Whether the operator declared the setup complete.
    ///
    /// Deterministic case-insensitive substring match; the model has no say.
    fn declares_readiness(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.readiness_keywords
            .iter()
            .any(|kw| lowered.contains(&kw.to_lowercase()))
    }

    /// Photo, verification, and on a pass a single robot dispatch.
    async fn run_verification_pipeline(&self, session: &mut Session) -> ChatReply {
        if session.executed {
            return ChatReply {
                reply: "The protocol run has already been started for this session. \
                        I will not start it a second time."
                    .to_string(),
                phase: session.phase,
                verification: None,
                image_index: None,
                action: None,
                executed: session.executed,
            };
        }

        if session.checklist.is_empty() {
            return ChatReply {
                reply: "I could not derive a checklist from this protocol, so I cannot \
                        verify the setup or start the run. Please start a new session."
                    .to_string(),
                phase: session.phase,
                verification: None,
                image_index: None,
                action: None,
                executed: session.executed,
            };
        }

        session.phase = Phase::Verifying;
        let photo = match self.camera.take_photo().await {
            Ok(photo) => photo,
            Err(e) => {
                error!(session_id = %session.id, error = %e, "photo capture failed");
                session.phase = Phase::AwaitingSetup;
                return ChatReply {
                    reply: format_error_for_chat(&Error::Tool(e)),
                    phase: session.phase,
                    verification: None,
                    image_index: None,
                    action: None,
                    executed: session.executed,
                };
            }
        };

        let image = ImageData::from_bytes(&photo.mime_type, &photo.bytes);
        let image_index = Some(session.push_image(photo));

        let checklist = session.checklist.clone();
        let result = match self
            .engine
            .verify_image(&checklist, &image, &mut session.context)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "verification call failed");
                session.phase = Phase::AwaitingSetup;
                return ChatReply {
                    reply: format_error_for_chat(&e),
                    phase: session.phase,
                    verification: None,
                    image_index,
                    action: Some("photo_taken".to_string()),
                    executed: session.executed,
                };
            }
        };

        if !result.passed() {
            session.phase = Phase::AwaitingSetup;
            let summary = failure_summary(&result);
            let reply = self.relay(&mut session.chat_context, &summary).await;
            return ChatReply {
                reply,
                phase: session.phase,
                verification: Some(result),
                image_index,
                action: Some("photo_taken".to_string()),
                executed: session.executed,
            };
        }

        // The flag goes up before the dispatch so a retry after an ambiguous
        // outcome can never issue a second run.
        session.executed = true;
        session.phase = Phase::Executing;
        match self.robot.upload_and_run(&session.protocol_text).await {
            Ok(run) => {
                info!(session_id = %session.id, run_id = %run.run_id, "protocol run started");
                session.phase = Phase::Done;
                let summary = format!(
                    "Setup verification passed on all {} checkpoints. The protocol \
                     run has been started (run id {}).",
                    result.checkpoints.len(),
                    run.run_id
                );
                let reply = self.relay(&mut session.chat_context, &summary).await;
                ChatReply {
                    reply,
                    phase: session.phase,
                    verification: Some(result),
                    image_index,
                    action: Some("protocol_executed".to_string()),
                    executed: session.executed,
                }
            }
            Err(platecheck_tools::Error::StatusUnknown(detail)) => {
                // The command may have reached the robot; the flag stays up.
                error!(session_id = %session.id, detail = %detail, "run outcome unconfirmed");
                session.phase = Phase::Done;
                ChatReply {
                    reply: format_error_for_chat(&Error::Tool(
                        platecheck_tools::Error::StatusUnknown(detail),
                    )),
                    phase: session.phase,
                    verification: Some(result),
                    image_index,
                    action: Some("photo_taken".to_string()),
                    executed: session.executed,
                }
            }
            Err(e) => {
                // Dispatch definitively failed; allow another attempt.
                error!(session_id = %session.id, error = %e, "run dispatch failed");
                session.executed = false;
                session.phase = Phase::AwaitingSetup;
                ChatReply {
                    reply: format_error_for_chat(&Error::Tool(e)),
                    phase: session.phase,
                    verification: Some(result),
                    image_index,
                    action: Some("photo_taken".to_string()),
                    executed: session.executed,
                }
            }
        }
    }

    /// Ordinary conversational turn.
    async fn free_form_reply(&self, session: &mut Session, text: &str) -> ChatReply {
        let reply = match self.chat(&mut session.chat_context, text.to_string()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "chat reply failed, using fallback");
                prompts::FALLBACK_REPLY.to_string()
            }
        };
        ChatReply {
            reply,
            phase: session.phase,
            verification: None,
            image_index: None,
            action: None,
            executed: session.executed,
        }
    }

    /// Hand a system-generated summary to the model to phrase for the
    /// operator. Falls back to the summary itself so no information is lost.
    async fn relay(&self, chat_context: &mut Vec<Message>, summary: &str) -> String {
        let note = format!(
            "[SYSTEM: {}] Relay this to the operator in your own words.",
            summary
        );
        match self.chat(chat_context, note).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "relay failed, returning raw summary");
                summary.to_string()
            }
        }
    }

    /// One completion on the conversational thread; commits both turns to
    /// the context only on success.
    async fn chat(&self, chat_context: &mut Vec<Message>, text: String) -> Result<String> {
        let message = Message::user(text);
        let request = CompletionRequest::new(self.model.clone())
            .with_system(prompts::CHAT_SYSTEM_INSTRUCTION)
            .with_messages(chat_context.clone())
            .with_messages(vec![message.clone()]);

        let response = self.provider.complete(request).await?;
        chat_context.push(message);
        chat_context.push(Message::assistant(response.content.clone()));
        Ok(response.content)
    }
}

/// Operator-readable summary of a failed verification.
fn failure_summary(result: &VerificationResult) -> String {
    let mut summary = String::from("Setup verification failed on these checkpoints:\n");
    for checkpoint in result
        .checkpoints
        .iter()
        .filter(|c| c.result != crate::checkpoint::Verdict::Pass)
    {
        summary.push_str(&format!(
            "- {}: {}\n",
            checkpoint.description, checkpoint.details
        ));
    }
    summary.push_str("Please fix these and tell me again when the setup is ready.");
    summary
}
