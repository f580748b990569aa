mod harness;

use axon_core::{RequestContext, StaticTokenSupplier};
use axon_llm::{Completions, LlmError, Message};
use harness::mock_provider::{MockProvider, MockTurn};
use harness::{config_for, config_with};

fn openai_text_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 4 }
    })
}

fn request(model: &str) -> axon_llm::CompletionRequest {
    axon_llm::CompletionRequest::new(model, vec![Message::user("Hello")])
}

#[tokio::test]
async fn openai_completion_normalizes_the_response() {
    let mock = MockProvider::start(vec![MockTurn::Json(openai_text_body("Hello from mock"))])
        .await
        .unwrap();
    let completions = Completions::from_config(&config_for("openai", &mock.v1_base_url())).unwrap();

    let response = completions
        .complete(&request("mock-model"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello from mock");
    assert_eq!(response.usage.input_tokens, 9);
    assert_eq!(response.usage.output_tokens, 4);
    assert!(response.tool_calls.is_empty());

    // Bearer auth carried the configured key
    assert_eq!(mock.last_header("authorization").as_deref(), Some("Bearer test-key"));
}

#[tokio::test]
async fn openai_tool_call_round_trips_through_the_codec() {
    let body = serde_json::json!({
        "id": "chatcmpl-1",
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": { "name": "get_weather", "arguments": "{\"city\":\"London\"}" }
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 4 }
    });
    let mock = MockProvider::start(vec![MockTurn::Json(body)]).await.unwrap();
    let completions = Completions::from_config(&config_for("openai", &mock.v1_base_url())).unwrap();

    let mut req = request("mock-model");
    req.tools = Some(vec![axon_llm::ToolDefinition::new(
        "get_weather",
        "Look up current weather",
        serde_json::json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    )]);

    let response = completions.complete(&req, &RequestContext::new()).await.unwrap();
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "get_weather");
    assert_eq!(response.tool_calls[0].arguments, r#"{"city":"London"}"#);

    // The tool definition went out on the wire
    let sent = mock.last_body().unwrap();
    assert_eq!(sent["tools"][0]["function"]["name"], "get_weather");
}

#[tokio::test]
async fn anthropic_completion_sends_version_and_key_headers() {
    let body = serde_json::json!({
        "id": "msg_1",
        "model": "mock-model",
        "content": [{ "type": "text", "text": "Hello from mock" }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 7, "output_tokens": 3, "cache_read_input_tokens": 2 }
    });
    let mock = MockProvider::start(vec![MockTurn::Json(body)]).await.unwrap();
    let completions = Completions::from_config(&config_for("anthropic", &mock.v1_base_url())).unwrap();

    let response = completions
        .complete(&request("mock-model"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello from mock");
    assert_eq!(response.usage.cache_read_tokens, 2);
    assert_eq!(mock.last_header("anthropic-version").as_deref(), Some("2023-06-01"));
    assert_eq!(mock.last_header("x-api-key").as_deref(), Some("test-key"));
}

#[tokio::test]
async fn google_ai_studio_authenticates_with_key_query_parameter() {
    let body = serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "Hello from mock" }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 2 }
    });
    let mock = MockProvider::start(vec![MockTurn::Json(body)]).await.unwrap();
    let completions = Completions::from_config(&config_for("google", &mock.google_base_url())).unwrap();

    let response = completions
        .complete(&request("mock-model"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello from mock");
    assert_eq!(mock.last_query_param("key").as_deref(), Some("test-key"));
    assert!(mock.last_header("authorization").is_none());
}

#[tokio::test]
async fn google_vertex_authenticates_with_supplied_bearer_token() {
    let body = serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "Hello from vertex" }] },
            "finishReason": "STOP"
        }]
    });
    let mock = MockProvider::start(vec![MockTurn::Json(body)]).await.unwrap();

    let config = axon_config::AxonConfig::from_toml(&format!(
        r#"
        [providers.mock]
        type = "google"
        base_url = "{}"
        vertex = {{ project = "my-project", location = "us-central1" }}
        "#,
        mock.vertex_base_url()
    ))
    .unwrap();

    let mut suppliers: std::collections::HashMap<String, std::sync::Arc<dyn axon_core::TokenSupplier>> =
        std::collections::HashMap::new();
    suppliers.insert(
        "mock".to_owned(),
        std::sync::Arc::new(StaticTokenSupplier::new("ya29.vertex-token")),
    );
    let completions = Completions::with_suppliers(&config, suppliers).unwrap();

    let response = completions
        .complete(&request("mock-model"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello from vertex");
    assert_eq!(
        mock.last_header("authorization").as_deref(),
        Some("Bearer ya29.vertex-token")
    );
    assert!(mock.last_query_param("key").is_none());
}

#[tokio::test]
async fn non_2xx_response_surfaces_status_and_body() {
    let mock = MockProvider::builder()
        .failures(1, 404, None)
        .turn(MockTurn::Json(openai_text_body("unreachable")))
        .start()
        .await
        .unwrap();
    let completions = Completions::from_config(&config_for("openai", &mock.v1_base_url())).unwrap();

    let result = completions.complete(&request("mock-model"), &RequestContext::new()).await;

    match result {
        Err(LlmError::Api { status, body, .. }) => {
            assert_eq!(status, 404);
            assert!(body.contains("induced failure"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    // 404 is not in the retry set
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn malformed_json_is_a_fatal_parse_error() {
    let mock = MockProvider::start(vec![MockTurn::Raw("not json{".to_owned())]).await.unwrap();
    let completions = Completions::from_config(&config_for("openai", &mock.v1_base_url())).unwrap();

    let result = completions.complete(&request("mock-model"), &RequestContext::new()).await;

    assert!(matches!(result, Err(LlmError::Parse(_))));
    // Parse errors are never retried
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn unknown_explicit_provider_is_a_caller_error() {
    let mock = MockProvider::start(vec![MockTurn::Json(openai_text_body("hi"))]).await.unwrap();
    let completions = Completions::from_config(&config_for("openai", &mock.v1_base_url())).unwrap();

    let result = completions
        .complete(&request("nonexistent/some-model"), &RequestContext::new())
        .await;

    assert!(matches!(result, Err(LlmError::ProviderNotFound { .. })));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn xai_dialect_maps_thinking_budget_with_its_own_thresholds() {
    let mock = MockProvider::start(vec![MockTurn::Json(openai_text_body("hi"))]).await.unwrap();
    let completions = Completions::from_config(&config_with("xai", &mock.v1_base_url(), 1, 20)).unwrap();

    let mut req = request("mock-model");
    // Below the xAI high threshold but above OpenAI's medium one
    req.thinking_budget = Some(9_000);
    completions.complete(&req, &RequestContext::new()).await.unwrap();

    let sent = mock.last_body().unwrap();
    assert_eq!(sent["reasoning_effort"], "low");
}
