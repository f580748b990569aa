use serde::{Deserialize, Serialize};

use super::message::ToolCallRequest;
use super::usage::TokenUsage;

/// Normalized event produced while consuming a provider stream
///
/// Events are delivered in the exact order produced by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental text content
    TextDelta(String),
    /// Partial tool-call data (name first, then argument fragments)
    ToolCallDelta(ToolCallDelta),
    /// A fully accumulated tool call
    ToolCall(ToolCallRequest),
    /// Usage snapshot; yielded once per stream by most providers
    Usage(TokenUsage),
    /// Stream has completed
    Done,
}

/// Incremental update for one streamed tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Slot index within this turn's tool-call list
    pub index: u32,
    /// Tool call ID (present on the first fragment only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name (present on the first fragment only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument JSON fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
