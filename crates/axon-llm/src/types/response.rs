use serde::{Deserialize, Serialize};

use super::message::ToolCallRequest;
use super::usage::TokenUsage;

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Model decided to call a tool
    ToolCalls,
    /// Content was filtered by safety systems
    ContentFilter,
}

/// Normalized complete response
///
/// The terminal shape every codec produces regardless of wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Provider-assigned response identifier (synthesized where absent)
    pub id: String,
    /// Model that produced the response
    pub model: String,
    /// Generated text content
    pub content: String,
    /// Tool calls requested by the model
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Why generation stopped
    pub finish_reason: Option<FinishReason>,
    /// Token usage for this turn
    #[serde(default)]
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Whether the model requested tool execution this turn
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
