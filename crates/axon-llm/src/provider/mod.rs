//! Provider trait and per-provider HTTP adapters

pub mod anthropic;
pub mod google;
pub mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use axon_core::RequestContext;
use futures_util::Stream;

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Ordered stream of normalized events from one streaming call
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Capabilities advertised by a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderCapabilities {
    /// Whether the provider supports streaming responses
    pub streaming: bool,
    /// Whether the provider supports tool calling
    pub tool_calling: bool,
    /// Whether the provider supports schema-constrained output
    pub structured_output: bool,
}

/// Trait implemented by each provider adapter
///
/// Adapters are stateless with respect to any single call and safe to
/// invoke concurrently for independent requests.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Configured provider name
    fn name(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send a non-streaming completion request
    async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError>;

    /// Send a streaming completion request
    ///
    /// Returns after response headers are received; the stream yields
    /// normalized events in transport order.
    async fn complete_stream(&self, request: &CompletionRequest, context: &RequestContext)
    -> Result<EventStream, LlmError>;
}

/// Map a transport-level send failure
pub(crate) fn send_error(provider: &str, e: &reqwest::Error) -> LlmError {
    tracing::error!(provider = %provider, error = %e, "upstream request failed");
    LlmError::Connect(e.to_string())
}

/// Convert a non-2xx response into an API error, preserving the raw body
/// and any `Retry-After` hint
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());
    let body = response.text().await.unwrap_or_default();

    tracing::warn!(provider = %provider, status = %status, "upstream returned error");

    LlmError::Api {
        status: status.as_u16(),
        body,
        retry_after,
    }
}
