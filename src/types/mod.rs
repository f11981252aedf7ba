//! Core type definitions: messages, capabilities, responses.

pub mod message;

pub use message::{AiResponse, Message, MessageRole, TokenUsage};

use serde::{Deserialize, Serialize};

/// Capability a request may require of a provider.
///
/// Closed set, dispatched structurally rather than by string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Streaming,
    FunctionCalling,
    Vision,
}
