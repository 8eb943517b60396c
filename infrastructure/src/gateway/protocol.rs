//! Wire types for the chat completions endpoint
//!
//! Outbound: a single JSON request body with `stream: true`.
//! Inbound: `data: <json>` lines, each carrying a [`ChatCompletionChunk`],
//! terminated by `data: [DONE]`.

use serde::{Deserialize, Serialize};
use streamchat_domain::{ChatMessage, ChatParams, Role};

/// Prefix of every payload-bearing line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Message as the endpoint expects it: role and content only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST {base_url}/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Build a streaming request. Message ids and timestamps stay local.
    pub fn streaming(messages: &[ChatMessage], params: &ChatParams) -> Self {
        Self {
            model: params.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: true,
        }
    }
}

/// One decoded `data:` payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Text of the first choice, if non-empty.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    /// Whether the first choice reports a finish reason. `null` and `""`
    /// both count as unset.
    pub fn is_finished(&self) -> bool {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
            .is_some_and(|reason| !reason.is_empty())
    }
}
