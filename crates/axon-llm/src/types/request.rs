use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::{ToolChoice, ToolDefinition};

/// Parameters controlling text generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Canonical provider-agnostic completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier, optionally `provider/model`
    pub model: String,
    /// Conversation messages; must be non-empty
    pub messages: Vec<Message>,
    /// System prompt, carried outside the message list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Generation parameters
    #[serde(default)]
    pub params: CompletionParams,
    /// Token allowance for internal deliberation before producing output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
    /// JSON schema constraining the response body (opaque pass-through)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    /// Request provider-side caching of the prompt prefix where supported
    #[serde(default)]
    pub cache: bool,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// How the model should select tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    /// Create a request with default generation parameters
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            params: CompletionParams::default(),
            thinking_budget: None,
            response_schema: None,
            cache: false,
            tools: None,
            tool_choice: None,
            stream: false,
        }
    }
}
