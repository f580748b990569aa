//! Conversion between canonical types and the `OpenAI` wire format
//!
//! Shared by the `OpenAI` and xAI adapters. The codec is parameterized by a
//! reasoning-effort mapping since neither provider accepts a raw token
//! budget; the thresholds are a compatibility contract, not a tuning knob.

use std::collections::BTreeMap;

use crate::protocol::openai::{
    OpenAiChoice, OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl,
    OpenAiJsonSchema, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiResponseFormat, OpenAiStreamChunk,
    OpenAiStreamOptions, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
use crate::types::{
    CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, Message, MessageKind, Role, StreamEvent,
    TokenUsage, ToolCallDelta, ToolCallRequest, ToolChoice, ToolDefinition,
};

/// Coarse reasoning-effort category accepted by OpenAI-style providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningEffort {
    /// Minimal deliberation
    Low,
    /// Moderate deliberation
    Medium,
    /// Maximal deliberation
    High,
}

impl ReasoningEffort {
    /// Wire value for the `reasoning_effort` field
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Maps a thinking budget (tokens) to a provider's effort category
pub type EffortMap = fn(u32) -> ReasoningEffort;

/// `OpenAI` thresholds: under 5000 low, up to 20000 medium, above high
pub fn openai_effort(budget: u32) -> ReasoningEffort {
    if budget < 5_000 {
        ReasoningEffort::Low
    } else if budget <= 20_000 {
        ReasoningEffort::Medium
    } else {
        ReasoningEffort::High
    }
}

/// xAI thresholds: under 10000 low, otherwise high (no medium tier)
pub fn xai_effort(budget: u32) -> ReasoningEffort {
    if budget < 10_000 {
        ReasoningEffort::Low
    } else {
        ReasoningEffort::High
    }
}

// -- Outbound: canonical request -> OpenAI wire request --

/// Serialize a canonical request into the `OpenAI` wire shape
pub fn encode_request(req: &CompletionRequest, effort: EffortMap, streaming: bool) -> OpenAiRequest {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(system) = &req.system {
        messages.push(OpenAiMessage {
            role: "system".to_owned(),
            content: Some(OpenAiContent::Text(system.clone())),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    messages.extend(req.messages.iter().map(encode_message));

    let response_format = req.response_schema.as_ref().map(|schema| OpenAiResponseFormat {
        format_type: "json_schema".to_owned(),
        json_schema: OpenAiJsonSchema {
            name: "response".to_owned(),
            strict: true,
            schema: schema.clone(),
        },
    });

    OpenAiRequest {
        model: req.model.clone(),
        messages,
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        max_tokens: req.params.max_tokens,
        stop: req.params.stop.clone(),
        reasoning_effort: req.thinking_budget.map(|budget| effort(budget).as_str().to_owned()),
        response_format,
        stream: streaming.then_some(true),
        stream_options: streaming.then_some(OpenAiStreamOptions { include_usage: true }),
        tools: req.tools.as_ref().map(|tools| tools.iter().map(encode_tool).collect()),
        tool_choice: req.tool_choice.as_ref().map(encode_tool_choice),
    }
}

/// Convert a canonical message, dispatching on its logical kind
fn encode_message(msg: &Message) -> OpenAiMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    match msg.kind() {
        MessageKind::ToolResult(id) => OpenAiMessage {
            role: "tool".to_owned(),
            content: Some(OpenAiContent::Text(msg.content.as_text())),
            tool_calls: None,
            tool_call_id: Some(id.to_owned()),
        },
        MessageKind::ToolUse(calls) => OpenAiMessage {
            role: "assistant".to_owned(),
            content: {
                let text = msg.content.as_text();
                if text.is_empty() {
                    None
                } else {
                    Some(OpenAiContent::Text(text))
                }
            },
            tool_calls: Some(calls.iter().map(encode_tool_call).collect()),
            tool_call_id: None,
        },
        MessageKind::Plain => OpenAiMessage {
            role: role.to_owned(),
            content: Some(encode_content(&msg.content)),
            tool_calls: None,
            tool_call_id: None,
        },
    }
}

fn encode_content(content: &Content) -> OpenAiContent {
    match content {
        Content::Text(text) => OpenAiContent::Text(text.clone()),
        Content::Parts(parts) => OpenAiContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => OpenAiContentPart::Text { text: text.clone() },
                    ContentPart::Image { url, detail } => OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: url.clone(),
                            detail: detail.clone(),
                        },
                    },
                })
                .collect(),
        ),
    }
}

fn encode_tool_call(call: &ToolCallRequest) -> OpenAiToolCall {
    OpenAiToolCall {
        id: call.id.clone(),
        tool_type: "function".to_owned(),
        function: OpenAiFunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        },
    }
}

fn encode_tool(tool: &ToolDefinition) -> OpenAiTool {
    OpenAiTool {
        tool_type: "function".to_owned(),
        function: OpenAiFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn encode_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::Value::String("auto".to_owned()),
        ToolChoice::Required => serde_json::Value::String("required".to_owned()),
        ToolChoice::None => serde_json::Value::String("none".to_owned()),
        ToolChoice::Tool { name } => serde_json::json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

// -- Inbound: OpenAI wire response -> canonical response --

/// Decode a complete `OpenAI` response into the normalized shape
pub fn decode_response(resp: OpenAiResponse) -> CompletionResponse {
    let usage = resp.usage.as_ref().map(decode_usage).unwrap_or_default();

    let (content, tool_calls, finish_reason) = resp.choices.into_iter().next().map_or_else(
        || (String::new(), Vec::new(), None),
        |choice| {
            let OpenAiChoice {
                message, finish_reason, ..
            } = choice;
            let tool_calls = message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                })
                .collect();
            (
                message.content.unwrap_or_default(),
                tool_calls,
                finish_reason.as_deref().and_then(parse_finish_reason),
            )
        },
    );

    CompletionResponse {
        id: resp.id,
        model: resp.model,
        content,
        tool_calls,
        finish_reason,
        usage,
    }
}

/// Extract usage, defaulting missing detail blocks to zero
fn decode_usage(usage: &OpenAiUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        cache_read_tokens: usage.prompt_tokens_details.as_ref().map_or(0, |d| d.cached_tokens),
        cache_write_tokens: 0,
        thinking_tokens: usage
            .completion_tokens_details
            .as_ref()
            .map_or(0, |d| d.reasoning_tokens),
    }
}

pub(crate) fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

// -- Stream accumulation --

/// Accumulates `OpenAI` stream chunks into normalized events
///
/// Tool calls arrive as index-addressed fragments: the first fragment for an
/// index carries the call ID and name, later fragments append to the
/// argument buffer. `finish_reason == "tool_calls"` flushes every slot in
/// index order and resets the accumulator. Owned by one streaming call.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    slots: BTreeMap<u32, ToolCallSlot>,
}

#[derive(Debug, Default)]
struct ToolCallSlot {
    id: String,
    name: String,
    arguments: String,
}

impl OpenAiStreamState {
    /// Create a fresh accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one stream chunk into zero or more normalized events
    pub fn decode_chunk(&mut self, chunk: &OpenAiStreamChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for choice in &chunk.choices {
            if let Some(text) = &choice.delta.content
                && !text.is_empty()
            {
                events.push(StreamEvent::TextDelta(text.clone()));
            }

            for tc in choice.delta.tool_calls.as_deref().unwrap_or_default() {
                let slot = self.slots.entry(tc.index).or_default();
                if let Some(id) = &tc.id {
                    slot.id.clone_from(id);
                }
                if let Some(function) = &tc.function {
                    if let Some(name) = &function.name {
                        slot.name.push_str(name);
                    }
                    if let Some(fragment) = &function.arguments {
                        slot.arguments.push_str(fragment);
                    }
                }

                events.push(StreamEvent::ToolCallDelta(ToolCallDelta {
                    index: tc.index,
                    id: tc.id.clone(),
                    name: tc.function.as_ref().and_then(|f| f.name.clone()),
                    arguments: tc.function.as_ref().and_then(|f| f.arguments.clone()),
                }));
            }

            if choice.finish_reason.as_deref() == Some("tool_calls") {
                for (_, slot) in std::mem::take(&mut self.slots) {
                    events.push(StreamEvent::ToolCall(ToolCallRequest {
                        id: slot.id,
                        name: slot.name,
                        arguments: slot.arguments,
                    }));
                }
            }
        }

        if let Some(usage) = &chunk.usage {
            events.push(StreamEvent::Usage(decode_usage(usage)));
        }

        events
    }
}
