//! Checkpoint engine - the two-phase LLM flow
//!
//! Phase 1 turns protocol text into a checklist; phase 2 judges a photo
//! against it. Both phases run in the same conversational context so the
//! model verifies against its own earlier checklist. A schema-invalid reply
//! gets exactly one reformat retry before surfacing a parse error.

use crate::checkpoint::{self, Checkpoint, VerificationResult};
use crate::error::{Error, Result};
use crate::prompts;
use platecheck_llm::{extract_json, ChatProvider, CompletionRequest, ImageData, Message};
use std::sync::Arc;
use tracing::{debug, warn};

/// Engine for checklist generation and image verification.
pub struct CheckpointEngine {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl CheckpointEngine {
    /// Create a new engine on top of a chat provider.
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Generate a checklist from protocol text.
    ///
    /// Appends the exchange to `context`; the assistant entry holds the
    /// canonical (re-numbered) checklist JSON so that phase 2 judges against
    /// exactly the ids this session will keep using.
    pub async fn generate_checklist(
        &self,
        protocol_text: &str,
        context: &mut Vec<Message>,
    ) -> Result<Vec<Checkpoint>> {
        let prompt = prompts::checklist_prompt(protocol_text);
        let (value, _raw) = self
            .complete_json(context, Message::user(prompt.clone()))
            .await?;

        let checklist = checkpoint::parse_checklist(&value)?;
        debug!(checkpoints = checklist.len(), "checklist generated");

        context.push(Message::user(prompt));
        context.push(Message::assistant(checkpoint::checklist_to_json(&checklist)));
        Ok(checklist)
    }

    /// Verify an image against an existing checklist.
    ///
    /// Every id in `checklist` is guaranteed a verdict in the result.
    pub async fn verify_image(
        &self,
        checklist: &[Checkpoint],
        image: &ImageData,
        context: &mut Vec<Message>,
    ) -> Result<VerificationResult> {
        if checklist.is_empty() {
            return Err(Error::InvalidState(
                "no checklist available for verification".to_string(),
            ));
        }

        let message = Message::user_with_image(prompts::VERIFY_PROMPT, image.clone());
        let (value, raw) = self.complete_json(context, message).await?;

        let result = checkpoint::parse_and_reconcile(checklist, &value)?;

        context.push(Message::user(prompts::VERIFY_PROMPT));
        context.push(Message::assistant(raw));
        Ok(result)
    }

    /// Send `message` on top of `context` and extract a JSON value from the
    /// reply, retrying once with a stricter reformat instruction.
    async fn complete_json(
        &self,
        context: &[Message],
        message: Message,
    ) -> Result<(serde_json::Value, String)> {
        let first = self.complete(context, &[message.clone()]).await?;
        if let Some(value) = extract_json(&first) {
            return Ok((value, first));
        }

        warn!("model reply was not parseable JSON, requesting reformat");
        let retry_turns = [
            message,
            Message::assistant(first),
            Message::user(prompts::REFORMAT_INSTRUCTION),
        ];
        let second = self.complete(context, &retry_turns).await?;
        match extract_json(&second) {
            Some(value) => Ok((value, second)),
            None => Err(Error::Parse(
                "model reply contained no JSON after reformat retry".to_string(),
            )),
        }
    }

    async fn complete(&self, context: &[Message], extra: &[Message]) -> Result<String> {
        let request = CompletionRequest::new(self.model.clone())
            .with_system(prompts::SYSTEM_INSTRUCTION)
            .with_messages(context.to_vec())
            .with_messages(extra.to_vec())
            .with_temperature(0.2);

        let response = self.provider.complete(request).await?;
        Ok(response.content)
    }
}
