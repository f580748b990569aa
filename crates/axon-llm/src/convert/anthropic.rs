//! Conversion between canonical types and the Anthropic Messages wire format

use crate::protocol::anthropic::{
    AnthropicCacheControl, AnthropicContent, AnthropicContentBlock, AnthropicImageSource, AnthropicMessage,
    AnthropicRequest, AnthropicResponse, AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta,
    AnthropicStreamEvent, AnthropicSystem, AnthropicSystemBlock, AnthropicThinking, AnthropicTool,
    AnthropicToolChoice, AnthropicUsage,
};
use crate::types::{
    CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, Message, MessageKind, Role, StreamEvent,
    TokenUsage, ToolCallDelta, ToolCallRequest, ToolChoice,
};

/// Default max tokens when the caller leaves it unset (the API requires one)
pub const DEFAULT_MAX_TOKENS: u32 = 8_192;

/// Headroom added above the thinking budget when it would swallow
/// `max_tokens`; the API rejects requests where the budget is not strictly
/// below `max_tokens`
const THINKING_HEADROOM: u32 = 4_096;

/// Synthetic forced tool emulating schema-constrained output
///
/// Anthropic has no native structured-output mode; the schema rides in as
/// this tool's input schema and the decoded call becomes the response body.
pub const JSON_RESPONSE_TOOL: &str = "json_response";

// -- Outbound: canonical request -> Anthropic wire request --

/// Serialize a canonical request into the Anthropic wire shape
pub fn encode_request(req: &CompletionRequest, streaming: bool) -> AnthropicRequest {
    let mut system_text = req.system.clone();
    let mut messages = Vec::new();

    for msg in &req.messages {
        if msg.role == Role::System {
            // System content is a top-level field, not a message
            let text = msg.content.as_text();
            match &mut system_text {
                Some(existing) => {
                    existing.push_str("\n\n");
                    existing.push_str(&text);
                }
                None => system_text = Some(text),
            }
            continue;
        }
        messages.push(encode_message(msg));
    }

    let system = system_text.map(|text| {
        if req.cache {
            AnthropicSystem::Blocks(vec![AnthropicSystemBlock {
                block_type: "text".to_owned(),
                text,
                cache_control: Some(AnthropicCacheControl::ephemeral()),
            }])
        } else {
            AnthropicSystem::Text(text)
        }
    });

    let mut max_tokens = req.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    let thinking = req.thinking_budget.map(|budget| {
        if max_tokens <= budget {
            max_tokens = budget + THINKING_HEADROOM;
        }
        AnthropicThinking {
            thinking_type: "enabled".to_owned(),
            budget_tokens: budget,
        }
    });

    let mut tools: Vec<AnthropicTool> = req
        .tools
        .as_ref()
        .map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
                .collect()
        })
        .unwrap_or_default();

    let mut tool_choice = req.tool_choice.as_ref().map(encode_tool_choice);

    if let Some(schema) = &req.response_schema {
        tools.push(AnthropicTool {
            name: JSON_RESPONSE_TOOL.to_owned(),
            description: Some("Respond with a JSON object matching the schema".to_owned()),
            input_schema: schema.clone(),
        });
        tool_choice = Some(AnthropicToolChoice {
            choice_type: "tool".to_owned(),
            name: Some(JSON_RESPONSE_TOOL.to_owned()),
        });
    }

    AnthropicRequest {
        model: req.model.clone(),
        max_tokens,
        system,
        messages,
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        stop_sequences: req.params.stop.clone(),
        thinking,
        stream: streaming.then_some(true),
        tools: if tools.is_empty() { None } else { Some(tools) },
        tool_choice,
    }
}

/// Convert a canonical message, dispatching on its logical kind
///
/// Anthropic has no tool role; results re-enter as `user` messages holding a
/// `tool_result` block.
fn encode_message(msg: &Message) -> AnthropicMessage {
    match msg.kind() {
        MessageKind::ToolResult(id) => AnthropicMessage {
            role: "user".to_owned(),
            content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                tool_use_id: id.to_owned(),
                content: Some(msg.content.as_text()),
                is_error: None,
            }]),
        },
        MessageKind::ToolUse(calls) => {
            let mut blocks = Vec::new();
            let text = msg.content.as_text();
            if !text.is_empty() {
                blocks.push(AnthropicContentBlock::Text { text });
            }
            for call in calls {
                let input = serde_json::from_str(&call.arguments).unwrap_or_else(|_| serde_json::json!({}));
                blocks.push(AnthropicContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input,
                });
            }
            AnthropicMessage {
                role: "assistant".to_owned(),
                content: AnthropicContent::Blocks(blocks),
            }
        }
        MessageKind::Plain => {
            let role = match msg.role {
                Role::Assistant => "assistant",
                _ => "user",
            };
            AnthropicMessage {
                role: role.to_owned(),
                content: encode_content(&msg.content),
            }
        }
    }
}

fn encode_content(content: &Content) -> AnthropicContent {
    match content {
        Content::Text(text) => AnthropicContent::Text(text.clone()),
        Content::Parts(parts) => AnthropicContent::Blocks(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                    ContentPart::Image { url, .. } => AnthropicContentBlock::Image {
                        source: encode_image_source(url),
                    },
                })
                .collect(),
        ),
    }
}

/// Split a data URI into a base64 source; anything else rides as a URL
fn encode_image_source(url: &str) -> AnthropicImageSource {
    if let Some(rest) = url.strip_prefix("data:")
        && let Some((mime_and_encoding, data)) = rest.split_once(',')
    {
        let media_type = mime_and_encoding.strip_suffix(";base64").unwrap_or(mime_and_encoding);
        AnthropicImageSource {
            source_type: "base64".to_owned(),
            media_type: Some(media_type.to_owned()),
            data: data.to_owned(),
        }
    } else {
        AnthropicImageSource {
            source_type: "url".to_owned(),
            media_type: None,
            data: url.to_owned(),
        }
    }
}

fn encode_tool_choice(choice: &ToolChoice) -> AnthropicToolChoice {
    match choice {
        // Anthropic has no "none" mode; both map to auto
        ToolChoice::Auto | ToolChoice::None => AnthropicToolChoice {
            choice_type: "auto".to_owned(),
            name: None,
        },
        ToolChoice::Required => AnthropicToolChoice {
            choice_type: "any".to_owned(),
            name: None,
        },
        ToolChoice::Tool { name } => AnthropicToolChoice {
            choice_type: "tool".to_owned(),
            name: Some(name.clone()),
        },
    }
}

// -- Inbound: Anthropic wire response -> canonical response --

/// Decode a complete Anthropic response into the normalized shape
pub fn decode_response(resp: AnthropicResponse) -> CompletionResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            AnthropicResponseBlock::Text { text } => content.push_str(&text),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                let arguments = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_owned());
                if name == JSON_RESPONSE_TOOL {
                    // Forced schema tool; its input is the response body
                    content.push_str(&arguments);
                } else {
                    tool_calls.push(ToolCallRequest { id, name, arguments });
                }
            }
            AnthropicResponseBlock::Thinking { .. } => {}
        }
    }

    CompletionResponse {
        id: resp.id,
        model: resp.model,
        content,
        tool_calls,
        finish_reason: resp.stop_reason.as_deref().and_then(parse_stop_reason),
        usage: decode_usage(&resp.usage),
    }
}

fn parse_stop_reason(s: &str) -> Option<FinishReason> {
    match s {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        _ => None,
    }
}

fn decode_usage(usage: &AnthropicUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        cache_read_tokens: usage.cache_read_input_tokens,
        cache_write_tokens: usage.cache_creation_input_tokens,
        thinking_tokens: 0,
    }
}

// -- Stream accumulation --

/// Accumulates Anthropic stream events into normalized events
///
/// Usage arrives split across the stream: input and cache counts at
/// `message_start`, output counts at `message_delta`. Both merge into one
/// running value that is yielded exactly once, at `message_stop`. Tool-call
/// arguments arrive as `input_json_delta` fragments and flush as a complete
/// call at the block's `content_block_stop`. Owned by one streaming call.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    usage: TokenUsage,
    current_tool: Option<ToolSlot>,
    /// Sequential index assigned to each tool call as it opens
    ///
    /// The wire's content block index is shared across text and tool blocks,
    /// so it cannot address the turn's tool-call list.
    next_tool_index: u32,
}

#[derive(Debug)]
struct ToolSlot {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl AnthropicStreamState {
    /// Create a fresh accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one stream event into zero or more normalized events
    pub fn decode_event(&mut self, event: &AnthropicStreamEvent) -> Vec<StreamEvent> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.usage = decode_usage(&message.usage);
                Vec::new()
            }

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    let index = self.next_tool_index;
                    self.next_tool_index += 1;
                    self.current_tool = Some(ToolSlot {
                        index,
                        id: id.clone(),
                        name: name.clone(),
                        arguments: String::new(),
                    });
                    vec![StreamEvent::ToolCallDelta(ToolCallDelta {
                        index,
                        id: Some(id.clone()),
                        name: Some(name.clone()),
                        arguments: None,
                    })]
                }
                AnthropicStreamContentBlock::Text { .. } | AnthropicStreamContentBlock::Thinking { .. } => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => vec![StreamEvent::TextDelta(text.clone())],
                AnthropicStreamDelta::InputJsonDelta { partial_json } => match &mut self.current_tool {
                    Some(slot) => {
                        slot.arguments.push_str(partial_json);
                        vec![StreamEvent::ToolCallDelta(ToolCallDelta {
                            index: slot.index,
                            id: None,
                            name: None,
                            arguments: Some(partial_json.clone()),
                        })]
                    }
                    None => Vec::new(),
                },
                AnthropicStreamDelta::ThinkingDelta { .. } | AnthropicStreamDelta::SignatureDelta { .. } => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockStop { .. } => match self.current_tool.take() {
                Some(slot) => {
                    let arguments = if slot.arguments.is_empty() {
                        "{}".to_owned()
                    } else {
                        slot.arguments
                    };
                    if slot.name == JSON_RESPONSE_TOOL {
                        vec![StreamEvent::TextDelta(arguments)]
                    } else {
                        vec![StreamEvent::ToolCall(ToolCallRequest {
                            id: slot.id,
                            name: slot.name,
                            arguments,
                        })]
                    }
                }
                None => Vec::new(),
            },

            AnthropicStreamEvent::MessageDelta { usage, .. } => {
                if let Some(delta_usage) = usage {
                    self.usage.output_tokens = delta_usage.output_tokens;
                }
                Vec::new()
            }

            AnthropicStreamEvent::MessageStop => {
                vec![StreamEvent::Usage(self.usage), StreamEvent::Done]
            }

            AnthropicStreamEvent::Ping => Vec::new(),
        }
    }
}
