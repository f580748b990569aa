mod harness;

use std::time::{Duration, Instant};

use axon_core::RequestContext;
use axon_llm::{Completions, LlmError, Message};
use harness::mock_provider::{MockProvider, MockTurn};
use harness::config_with;

fn text_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 3, "completion_tokens": 2 }
    })
}

fn request() -> axon_llm::CompletionRequest {
    axon_llm::CompletionRequest::new("mock-model", vec![Message::user("Hello")])
}

#[tokio::test]
async fn transient_500s_are_retried_until_success() {
    let mock = MockProvider::builder()
        .failures(2, 500, None)
        .turn(MockTurn::Json(text_body("recovered")))
        .start()
        .await
        .unwrap();
    let completions = Completions::from_config(&config_with("openai", &mock.v1_base_url(), 1, 20)).unwrap();

    let response = completions.complete(&request(), &RequestContext::new()).await.unwrap();

    assert_eq!(response.content, "recovered");
    assert_eq!(mock.request_count(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mock = MockProvider::builder()
        .failures(5, 400, None)
        .turn(MockTurn::Json(text_body("unreachable")))
        .start()
        .await
        .unwrap();
    let completions = Completions::from_config(&config_with("openai", &mock.v1_base_url(), 1, 20)).unwrap();

    let result = completions.complete(&request(), &RequestContext::new()).await;

    assert!(matches!(result, Err(LlmError::Api { status: 400, .. })));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn attempts_are_capped_at_four() {
    let mock = MockProvider::builder()
        .failures(100, 503, None)
        .turn(MockTurn::Json(text_body("unreachable")))
        .start()
        .await
        .unwrap();
    let completions = Completions::from_config(&config_with("openai", &mock.v1_base_url(), 1, 20)).unwrap();

    let result = completions.complete(&request(), &RequestContext::new()).await;

    assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn retry_after_hint_replaces_the_computed_backoff() {
    let mock = MockProvider::builder()
        .failures(1, 429, Some(1))
        .turn(MockTurn::Json(text_body("after backoff")))
        .start()
        .await
        .unwrap();
    // Computed backoff would be 30s; the 1s hint must win
    let completions = Completions::from_config(&config_with("openai", &mock.v1_base_url(), 30_000, 20)).unwrap();

    let start = Instant::now();
    let response = completions.complete(&request(), &RequestContext::new()).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.content, "after backoff");
    assert_eq!(mock.request_count(), 2);
    assert!(elapsed >= Duration::from_millis(900), "retried too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "hint was ignored: {elapsed:?}");
}

#[tokio::test]
async fn streaming_connection_establishment_is_retried() {
    let sse_body = harness::sse_with_done(&[serde_json::json!({
        "id": "c1",
        "choices": [{ "index": 0, "delta": { "content": "Hello" } }]
    })]);
    let mock = MockProvider::builder()
        .failures(2, 502, None)
        .turn(MockTurn::Sse(sse_body))
        .start()
        .await
        .unwrap();
    let completions = Completions::from_config(&config_with("openai", &mock.v1_base_url(), 1, 20)).unwrap();

    let stream = completions
        .complete_stream(&request(), &RequestContext::new())
        .await
        .unwrap();
    let events: Vec<_> = futures_util::StreamExt::collect::<Vec<_>>(stream)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(mock.request_count(), 3);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, axon_llm::types::StreamEvent::TextDelta(t) if t == "Hello"))
    );
}
