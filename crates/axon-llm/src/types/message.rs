use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

/// Message in a conversation
///
/// One flexible record for ergonomics; codecs dispatch on the logical
/// [`MessageKind`] instead of probing the optional fields directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// ID of the tool call this message is a response to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a plain assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Create a tool message from an executed tool result
    pub fn tool(result: &ToolCallResult) -> Self {
        Self {
            role: Role::Tool,
            content: Content::Text(result.content.clone()),
            tool_calls: None,
            tool_call_id: Some(result.tool_call_id.clone()),
        }
    }

    /// Logical kind of this message
    pub fn kind(&self) -> MessageKind<'_> {
        if let Some(id) = &self.tool_call_id {
            return MessageKind::ToolResult(id);
        }
        match &self.tool_calls {
            Some(calls) if !calls.is_empty() => MessageKind::ToolUse(calls),
            _ => MessageKind::Plain,
        }
    }
}

/// Logical message kind derived from the flexible record
#[derive(Debug, Clone, Copy)]
pub enum MessageKind<'a> {
    /// Plain text (or multipart) content
    Plain,
    /// Assistant message carrying tool calls
    ToolUse(&'a [ToolCallRequest]),
    /// Result of a tool call, keyed by its originating call ID
    ToolResult(&'a str),
}

/// Message content, either plain text or structured parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Array of content parts (text, images)
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Extract text content, joining parts if necessary
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Individual part within a multipart message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content block
    Text {
        /// The text string
        text: String,
    },
    /// Image attachment
    Image {
        /// URL or base64 data URI for the image
        url: String,
        /// Detail level hint (e.g. "auto", "low", "high")
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// A tool invocation requested by the model
///
/// Produced by a provider response, consumed by the external tool executor.
/// The ID is provider-assigned and opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned identifier for this call
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Raw JSON arguments string
    pub arguments: String,
}

/// Result of an externally executed tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// ID of the tool call this result responds to
    pub tool_call_id: String,
    /// Result payload, JSON or plain text
    pub content: String,
    /// Whether the tool failed for a domain reason
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Successful result
    pub fn ok(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Domain-level failure; fed back to the model rather than aborting
    pub fn error(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}
