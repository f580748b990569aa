//! Shared test harness: an in-process mock provider and config builders

// Each test binary uses a different slice of the harness
#![allow(dead_code)]

pub mod mock_provider;

use axon_config::AxonConfig;

/// Config with one provider pointed at a mock base URL and fast retry
/// settings so failing tests don't stall
pub fn config_for(provider_type: &str, base_url: &str) -> AxonConfig {
    config_with(provider_type, base_url, 1, 20)
}

/// Config with explicit retry base delay (ms) and tool-loop bound
pub fn config_with(provider_type: &str, base_url: &str, base_delay_ms: u64, max_iterations: u32) -> AxonConfig {
    AxonConfig::from_toml(&format!(
        r#"
        [providers.mock]
        type = "{provider_type}"
        api_key = "test-key"
        base_url = "{base_url}"

        [retry]
        base_delay_ms = {base_delay_ms}
        max_delay_ms = {base_delay_ms}

        [tool_loop]
        max_iterations = {max_iterations}
        "#
    ))
    .expect("valid test config")
}

/// Build an SSE body from JSON data frames
pub fn sse(frames: &[serde_json::Value]) -> String {
    frames
        .iter()
        .map(|frame| format!("data: {frame}\n\n"))
        .collect::<Vec<_>>()
        .join("")
}

/// OpenAI-style SSE body: data frames plus the `[DONE]` sentinel
pub fn sse_with_done(frames: &[serde_json::Value]) -> String {
    format!("{}data: [DONE]\n\n", sse(frames))
}

/// Anthropic-style SSE body: `event:` lines derived from each frame's type
pub fn anthropic_sse(frames: &[serde_json::Value]) -> String {
    frames
        .iter()
        .map(|frame| {
            let event = frame["type"].as_str().unwrap_or("message");
            format!("event: {event}\ndata: {frame}\n\n")
        })
        .collect::<Vec<_>>()
        .join("")
}
