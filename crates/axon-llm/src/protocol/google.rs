//! Google Generative Language API wire format types
//!
//! The same body shape is used by AI Studio (`generativelanguage.googleapis.com`)
//! and Vertex (`{location}-aiplatform.googleapis.com`); only auth and URL
//! scoping differ.

use serde::{Deserialize, Serialize};

// -- Request types --

/// Google `generateContent` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleRequest {
    /// Conversation contents
    pub contents: Vec<GoogleContent>,
    /// System instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GoogleContent>,
    /// Generation configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GoogleGenerationConfig>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GoogleTool>>,
    /// Tool configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<GoogleToolConfig>,
}

/// Google content object containing role and parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleContent {
    /// Role ("user" or "model"; tool results come back as "user")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    pub parts: Vec<GooglePart>,
}

/// Individual part within a Google content object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GooglePart {
    /// Text content
    Text(String),
    /// Inline binary data (images)
    InlineData(GoogleInlineData),
    /// Function call from the model
    FunctionCall(GoogleFunctionCall),
    /// Function response from the user
    FunctionResponse(GoogleFunctionResponse),
}

/// Inline binary data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleInlineData {
    /// MIME type (e.g. "image/png")
    pub mime_type: String,
    /// Base64-encoded data
    pub data: String,
}

/// Function call from the model
///
/// Always complete; Google never fragments arguments across chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleFunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON
    pub args: serde_json::Value,
}

/// Function response from the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleFunctionResponse {
    /// Function name
    pub name: String,
    /// Response content as JSON
    pub response: serde_json::Value,
}

/// Generation configuration parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGenerationConfig {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Thinking budget configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<GoogleThinkingConfig>,
    /// Response MIME type ("application/json" for schema output)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// JSON schema constraining the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

/// Thinking budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleThinkingConfig {
    /// Token budget for deliberation
    pub thinking_budget: u32,
}

/// Google tool definition wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTool {
    /// Function declarations
    pub function_declarations: Vec<GoogleFunctionDeclaration>,
}

/// Google function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleFunctionDeclaration {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Google tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToolConfig {
    /// Function calling config
    pub function_calling_config: GoogleFunctionCallingConfig,
}

/// Function calling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleFunctionCallingConfig {
    /// Mode: "AUTO", "ANY", "NONE"
    pub mode: String,
    /// Allowed function names (when mode is "ANY")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_function_names: Option<Vec<String>>,
}

// -- Response types --

/// Google `generateContent` response
///
/// Streaming chunks are complete objects of this same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GoogleCandidate>,
    /// Token usage metadata
    #[serde(default)]
    pub usage_metadata: Option<GoogleUsageMetadata>,
}

/// Generated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCandidate {
    /// Generated content
    pub content: GoogleContent,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Candidate index
    #[serde(default)]
    pub index: Option<u32>,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUsageMetadata {
    /// Prompt token count
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Candidates token count
    #[serde(default)]
    pub candidates_token_count: u32,
    /// Tokens served from cached content
    #[serde(default)]
    pub cached_content_token_count: u32,
    /// Tokens spent thinking
    #[serde(default)]
    pub thoughts_token_count: u32,
}
