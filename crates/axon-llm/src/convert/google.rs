//! Conversion between canonical types and the Google Generative Language
//! wire format

use crate::protocol::google::{
    GoogleContent, GoogleFunctionCall, GoogleFunctionCallingConfig, GoogleFunctionDeclaration, GoogleFunctionResponse,
    GoogleGenerationConfig, GoogleInlineData, GooglePart, GoogleRequest, GoogleResponse, GoogleThinkingConfig,
    GoogleTool, GoogleToolConfig, GoogleUsageMetadata,
};
use crate::types::{
    CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, Message, MessageKind, Role, StreamEvent,
    TokenUsage, ToolCallRequest, ToolChoice,
};

/// Prefix for synthesized tool-call IDs
///
/// Google assigns no IDs; calls are matched back by function name, so the
/// original name must be recoverable from the ID.
const CALL_ID_PREFIX: &str = "call_";

// -- Outbound: canonical request -> Google wire request --

/// Serialize a canonical request into the Google wire shape
pub fn encode_request(req: &CompletionRequest) -> GoogleRequest {
    let mut system_text = req.system.clone();
    let mut contents = Vec::new();

    for msg in &req.messages {
        if msg.role == Role::System {
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
        contents.push(encode_message(msg));
    }

    let system_instruction = system_text.map(|text| GoogleContent {
        role: None,
        parts: vec![GooglePart::Text(text)],
    });

    let generation_config = GoogleGenerationConfig {
        temperature: req.params.temperature,
        top_p: req.params.top_p,
        max_output_tokens: req.params.max_tokens,
        stop_sequences: req.params.stop.clone(),
        thinking_config: req
            .thinking_budget
            .map(|thinking_budget| GoogleThinkingConfig { thinking_budget }),
        response_mime_type: req.response_schema.as_ref().map(|_| "application/json".to_owned()),
        response_schema: req.response_schema.clone(),
    };

    let tools = req.tools.as_ref().map(|tools| {
        vec![GoogleTool {
            function_declarations: tools
                .iter()
                .map(|t| GoogleFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                })
                .collect(),
        }]
    });

    let tool_config = req.tool_choice.as_ref().map(|choice| {
        let (mode, allowed_function_names) = match choice {
            ToolChoice::None => ("NONE".to_owned(), None),
            ToolChoice::Auto => ("AUTO".to_owned(), None),
            ToolChoice::Required => ("ANY".to_owned(), None),
            ToolChoice::Tool { name } => ("ANY".to_owned(), Some(vec![name.clone()])),
        };
        GoogleToolConfig {
            function_calling_config: GoogleFunctionCallingConfig {
                mode,
                allowed_function_names,
            },
        }
    });

    GoogleRequest {
        contents,
        system_instruction,
        generation_config: Some(generation_config),
        tools,
        tool_config,
    }
}

/// Convert a canonical message, dispatching on its logical kind
///
/// Google knows only `user` and `model` roles; tool results re-enter as
/// `user` contents holding a `functionResponse` part.
fn encode_message(msg: &Message) -> GoogleContent {
    match msg.kind() {
        MessageKind::ToolResult(id) => {
            let text = msg.content.as_text();
            let response = serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "result": text }));
            GoogleContent {
                role: Some("user".to_owned()),
                parts: vec![GooglePart::FunctionResponse(GoogleFunctionResponse {
                    name: function_name_from_call_id(id).to_owned(),
                    response,
                })],
            }
        }
        MessageKind::ToolUse(calls) => {
            let mut parts = Vec::new();
            let text = msg.content.as_text();
            if !text.is_empty() {
                parts.push(GooglePart::Text(text));
            }
            for call in calls {
                let args = serde_json::from_str(&call.arguments).unwrap_or_else(|_| serde_json::json!({}));
                parts.push(GooglePart::FunctionCall(GoogleFunctionCall {
                    name: call.name.clone(),
                    args,
                }));
            }
            GoogleContent {
                role: Some("model".to_owned()),
                parts,
            }
        }
        MessageKind::Plain => {
            let role = match msg.role {
                Role::Assistant => "model",
                _ => "user",
            };
            let mut parts = encode_parts(&msg.content);
            // The API rejects empty part lists
            if parts.is_empty() {
                parts.push(GooglePart::Text(String::new()));
            }
            GoogleContent {
                role: Some(role.to_owned()),
                parts,
            }
        }
    }
}

fn encode_parts(content: &Content) -> Vec<GooglePart> {
    match content {
        Content::Text(text) => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![GooglePart::Text(text.clone())]
            }
        }
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(GooglePart::Text(text.clone())),
                ContentPart::Image { url, .. } => {
                    // Only data URIs can ride as inline data
                    let rest = url.strip_prefix("data:")?;
                    let (mime_and_encoding, data) = rest.split_once(',')?;
                    let mime_type = mime_and_encoding.strip_suffix(";base64").unwrap_or(mime_and_encoding);
                    Some(GooglePart::InlineData(GoogleInlineData {
                        mime_type: mime_type.to_owned(),
                        data: data.to_owned(),
                    }))
                }
            })
            .collect(),
    }
}

/// Recover the function name from a synthesized call ID
fn function_name_from_call_id(id: &str) -> &str {
    id.strip_prefix(CALL_ID_PREFIX).unwrap_or(id)
}

// -- Inbound: Google wire response -> canonical response --

/// Decode a complete Google response into the normalized shape
///
/// Google omits both a response ID and the model name; the caller supplies
/// the model and the ID is synthesized.
pub fn decode_response(resp: GoogleResponse, model: &str) -> CompletionResponse {
    let usage = resp.usage_metadata.as_ref().map(decode_usage).unwrap_or_default();

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    if let Some(candidate) = resp.candidates.first() {
        for part in &candidate.content.parts {
            match part {
                GooglePart::Text(text) => content.push_str(text),
                GooglePart::FunctionCall(fc) => tool_calls.push(decode_function_call(fc)),
                GooglePart::InlineData(_) | GooglePart::FunctionResponse(_) => {}
            }
        }
        finish_reason = candidate.finish_reason.as_deref().and_then(parse_finish_reason);
    }

    CompletionResponse {
        id: format!("google-{model}"),
        model: model.to_owned(),
        content,
        tool_calls,
        finish_reason,
        usage,
    }
}

fn decode_function_call(fc: &GoogleFunctionCall) -> ToolCallRequest {
    let arguments = serde_json::to_string(&fc.args).unwrap_or_else(|_| "{}".to_owned());
    ToolCallRequest {
        id: format!("{CALL_ID_PREFIX}{}", fc.name),
        name: fc.name.clone(),
        arguments,
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "STOP" => Some(FinishReason::Stop),
        "MAX_TOKENS" => Some(FinishReason::Length),
        "SAFETY" | "PROHIBITED_CONTENT" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn decode_usage(usage: &GoogleUsageMetadata) -> TokenUsage {
    TokenUsage {
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        cache_read_tokens: usage.cached_content_token_count,
        cache_write_tokens: 0,
        thinking_tokens: usage.thoughts_token_count,
    }
}

// -- Stream decoding --

/// Convert one Google stream chunk into normalized events
///
/// Stateless by design: Google never fragments function-call arguments, so
/// each `functionCall` part is immediately a complete tool call, and
/// `usageMetadata` is forwarded whenever present (typically only the final
/// chunk carries it).
pub fn decode_chunk(chunk: &GoogleResponse) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for candidate in &chunk.candidates {
        for part in &candidate.content.parts {
            match part {
                GooglePart::Text(text) => {
                    if !text.is_empty() {
                        events.push(StreamEvent::TextDelta(text.clone()));
                    }
                }
                GooglePart::FunctionCall(fc) => events.push(StreamEvent::ToolCall(decode_function_call(fc))),
                GooglePart::InlineData(_) | GooglePart::FunctionResponse(_) => {}
            }
        }
    }

    if let Some(usage) = &chunk.usage_metadata {
        events.push(StreamEvent::Usage(decode_usage(usage)));
    }

    events
}
