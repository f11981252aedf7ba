//! Conversation message and response types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Token usage reported by a provider for a single completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of a successful orchestrated completion.
///
/// Not persisted here; storing conversation history and usage metrics is the
/// calling layer's responsibility.
#[derive(Debug, Clone, Serialize)]
pub struct AiResponse {
    /// Name of the provider that produced the content.
    pub provider: String,
    pub content: String,
    pub usage: Option<TokenUsage>,
    /// Observed end-to-end latency of the winning call.
    pub latency: Duration,
    /// Correlation id of the request this response answers.
    pub request_id: String,
}
