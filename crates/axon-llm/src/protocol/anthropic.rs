//! Anthropic Messages API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Anthropic Messages request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicRequest {
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate; required by the API
    pub max_tokens: u32,
    /// System prompt (string, or cacheable blocks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<AnthropicSystem>,
    /// Conversation messages
    pub messages: Vec<AnthropicMessage>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Extended thinking configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    /// Tool choice configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<AnthropicToolChoice>,
}

/// System prompt: a plain string, or cacheable blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicSystem {
    /// Plain system prompt
    Text(String),
    /// Block form, used when prompt caching is requested
    Blocks(Vec<AnthropicSystemBlock>),
}

/// System prompt block with optional cache control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicSystemBlock {
    /// Always "text"
    #[serde(rename = "type")]
    pub block_type: String,
    /// Block text
    pub text: String,
    /// Cache marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<AnthropicCacheControl>,
}

/// Prompt cache marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicCacheControl {
    /// Always "ephemeral"
    #[serde(rename = "type")]
    pub control_type: String,
}

impl AnthropicCacheControl {
    /// The only cache type the API accepts
    pub fn ephemeral() -> Self {
        Self {
            control_type: "ephemeral".to_owned(),
        }
    }
}

/// Extended thinking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicThinking {
    /// Always "enabled"
    #[serde(rename = "type")]
    pub thinking_type: String,
    /// Token budget for deliberation
    pub budget_tokens: u32,
}

/// Anthropic message within a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role ("user" or "assistant"; there is no tool role)
    pub role: String,
    /// Message content
    pub content: AnthropicContent,
}

/// Message content: a plain string or typed blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    /// Plain text content
    Text(String),
    /// Typed content blocks
    Blocks(Vec<AnthropicContentBlock>),
}

/// Typed content block within a request message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Image block
    Image {
        /// Image source
        source: AnthropicImageSource,
    },
    /// Tool invocation by the assistant
    ToolUse {
        /// Tool call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments as a JSON object
        input: serde_json::Value,
    },
    /// Tool result fed back by the user
    ToolResult {
        /// ID of the originating tool call
        tool_use_id: String,
        /// Result payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Whether the tool failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Image source specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicImageSource {
    /// "base64" or "url"
    #[serde(rename = "type")]
    pub source_type: String,
    /// MIME type for base64 sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Base64 payload or URL
    pub data: String,
}

/// Anthropic tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool input
    pub input_schema: serde_json::Value,
}

/// Anthropic tool choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicToolChoice {
    /// "auto", "any", or "tool"
    #[serde(rename = "type")]
    pub choice_type: String,
    /// Tool name when type is "tool"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// -- Response types --

/// Anthropic Messages response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicResponse {
    /// Response identifier
    pub id: String,
    /// Model used
    pub model: String,
    /// Generated content blocks
    pub content: Vec<AnthropicResponseBlock>,
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Content block within a response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicResponseBlock {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Tool invocation
    ToolUse {
        /// Tool call identifier
        id: String,
        /// Tool name
        name: String,
        /// Arguments as a JSON object
        input: serde_json::Value,
    },
    /// Extended thinking block
    Thinking {
        /// Deliberation text
        thinking: String,
        /// Integrity signature
        #[serde(default)]
        signature: Option<String>,
    },
}

/// Token usage in a response or `message_start` frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub output_tokens: u32,
    /// Tokens read from the prompt cache
    #[serde(default)]
    pub cache_read_input_tokens: u32,
    /// Tokens written to the prompt cache
    #[serde(default)]
    pub cache_creation_input_tokens: u32,
}

// -- Streaming types --

/// Anthropic server-sent stream event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Message envelope; carries input and cache usage
    MessageStart {
        /// Envelope payload
        message: AnthropicMessageStart,
    },
    /// A content block opened
    ContentBlockStart {
        /// Content block index
        index: u32,
        /// The opening block
        content_block: AnthropicStreamContentBlock,
    },
    /// Incremental content for the open block
    ContentBlockDelta {
        /// Content block index
        index: u32,
        /// Typed delta
        delta: AnthropicStreamDelta,
    },
    /// The open content block closed
    ContentBlockStop {
        /// Content block index
        index: u32,
    },
    /// Message-level delta; carries output usage and stop reason
    MessageDelta {
        /// Stop information
        delta: AnthropicMessageDelta,
        /// Output token count
        #[serde(default)]
        usage: Option<AnthropicDeltaUsage>,
    },
    /// End of stream
    MessageStop,
    /// Keepalive
    Ping,
}

/// Envelope payload of a `message_start` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessageStart {
    /// Input-side usage, known upfront
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Opening content block in a stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamContentBlock {
    /// Text block
    Text {
        /// Initial text (normally empty)
        #[serde(default)]
        text: String,
    },
    /// Tool invocation; arguments arrive as `input_json_delta` fragments
    ToolUse {
        /// Tool call identifier
        id: String,
        /// Tool name
        name: String,
    },
    /// Extended thinking block
    Thinking {
        /// Initial deliberation text
        #[serde(default)]
        thinking: String,
    },
}

/// Typed delta within a `content_block_delta` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamDelta {
    /// Text fragment
    TextDelta {
        /// The fragment
        text: String,
    },
    /// Tool argument JSON fragment
    InputJsonDelta {
        /// The fragment
        partial_json: String,
    },
    /// Thinking fragment
    ThinkingDelta {
        /// The fragment
        thinking: String,
    },
    /// Thinking integrity signature
    SignatureDelta {
        /// The signature
        signature: String,
    },
}

/// Stop information within a `message_delta` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicMessageDelta {
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Matched stop sequence
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Output usage within a `message_delta` event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicDeltaUsage {
    /// Completion tokens so far
    #[serde(default)]
    pub output_tokens: u32,
}
