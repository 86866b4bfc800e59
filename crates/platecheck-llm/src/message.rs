//! Message types for LLM conversations

use serde::{Deserialize, Serialize};

/// Role in a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// An inline image attached to a message (base64 payload + MIME type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// MIME type, e.g. `image/jpeg`
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

impl ImageData {
    /// Encode raw bytes into an inline image attachment.
    #[must_use]
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Inline image attachment (multimodal requests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageData>,
}

impl Message {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            image: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image: None,
        }
    }

    /// Create a user message carrying an inline image
    #[must_use]
    pub fn user_with_image(content: impl Into<String>, image: ImageData) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            image: Some(image),
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            image: None,
        }
    }
}
