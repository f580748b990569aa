//! Anthropic Messages API provider adapter

use async_trait::async_trait;
use axon_config::ProviderConfig;
use axon_core::RequestContext;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, ProviderCapabilities, api_error, send_error};
use crate::convert::anthropic::{AnthropicStreamState, decode_response, encode_request};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicResponse, AnthropicStreamEvent};
use crate::types::{CompletionRequest, CompletionResponse};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider adapter
pub struct AnthropicProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl AnthropicProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with the other
    /// adapters.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (cannot happen).
    pub fn new(name: String, config: &ProviderConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve the API key: per-request override first, then configured key
    fn resolve_api_key(&self, context: &RequestContext) -> Option<String> {
        context
            .api_key
            .as_ref()
            .or(self.api_key.as_ref())
            .map(|k| k.expose_secret().to_owned())
    }

    /// Build the messages endpoint URL
    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    async fn send(&self, body: &impl serde::Serialize, context: &RequestContext) -> Result<reqwest::Response, LlmError> {
        let mut builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body);

        if let Some(key) = self.resolve_api_key(context) {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.map_err(|e| send_error(&self.name, &e))?;
        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            // Emulated via the forced json_response tool
            structured_output: true,
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let wire_request = encode_request(request, false);
        let response = self.send(&wire_request, context).await?;

        let wire_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("invalid messages response: {e}")))?;

        Ok(decode_response(wire_response))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let wire_request = encode_request(request, true);
        let response = self.send(&wire_request, context).await?;

        let event_stream = response.bytes_stream().eventsource();
        let mut state = AnthropicStreamState::new();

        let mapped = event_stream
            .map(move |result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        return Vec::new();
                    }
                    match serde_json::from_str::<AnthropicStreamEvent>(data) {
                        Ok(stream_event) => state.decode_event(&stream_event).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(error = %e, "skipping unparseable Anthropic SSE event");
                            Vec::new()
                        }
                    }
                }
                Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter);

        Ok(Box::pin(mapped))
    }
}
