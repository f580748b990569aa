//! OpenAI-compatible provider adapter
//!
//! Serves both the `OpenAI` and xAI APIs; the dialect fixes the default base
//! URL and the reasoning-effort mapping.

use async_trait::async_trait;
use axon_config::ProviderConfig;
use axon_core::RequestContext;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, ProviderCapabilities, api_error, send_error};
use crate::convert::openai::{EffortMap, OpenAiStreamState, decode_response, encode_request, openai_effort, xai_effort};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiResponse, OpenAiStreamChunk};
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Which OpenAI-compatible dialect the adapter speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiDialect {
    /// The canonical `OpenAI` API
    OpenAi,
    /// xAI's compatible API
    Xai,
}

impl OpenAiDialect {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Xai => "https://api.x.ai/v1",
        }
    }

    /// Thinking-budget mapping; the thresholds differ per dialect
    fn effort_map(self) -> EffortMap {
        match self {
            Self::OpenAi => openai_effort,
            Self::Xai => xai_effort,
        }
    }
}

/// OpenAI-compatible provider adapter
pub struct OpenAiProvider {
    name: String,
    dialect: OpenAiDialect,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl OpenAiProvider {
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
    pub fn new(name: String, dialect: OpenAiDialect, config: &ProviderConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Url::parse(dialect.default_base_url()).expect("valid default URL"));

        Ok(Self {
            name,
            dialect,
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

    /// Build the chat completions URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    async fn send(&self, body: &impl serde::Serialize, context: &RequestContext) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.completions_url()).json(body);
        if let Some(key) = self.resolve_api_key(context) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| send_error(&self.name, &e))?;
        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            structured_output: true,
        }
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let wire_request = encode_request(request, self.dialect.effort_map(), false);
        let response = self.send(&wire_request, context).await?;

        let wire_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("invalid completion response: {e}")))?;

        Ok(decode_response(wire_response))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let wire_request = encode_request(request, self.dialect.effort_map(), true);
        let response = self.send(&wire_request, context).await?;

        let event_stream = response.bytes_stream().eventsource();
        let mut state = OpenAiStreamState::new();

        let mapped = event_stream
            .map(move |result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == "[DONE]" {
                        return vec![Ok(StreamEvent::Done)];
                    }
                    match serde_json::from_str::<OpenAiStreamChunk>(data) {
                        Ok(chunk) => state.decode_chunk(&chunk).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
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
