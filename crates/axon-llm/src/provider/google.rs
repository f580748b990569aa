//! Google Generative Language provider adapter
//!
//! Speaks to AI Studio with an API-key query parameter, or to Vertex with a
//! bearer token from a [`TokenSupplier`] and project/location-scoped URLs.
//! The mode is selected by whether a token supplier is configured.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use axon_config::{ProviderConfig, VertexConfig};
use axon_core::{RequestContext, TokenSupplier};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{EventStream, Provider, ProviderCapabilities, api_error, send_error};
use crate::convert::google::{decode_chunk, decode_response, encode_request};
use crate::error::LlmError;
use crate::protocol::google::GoogleResponse;
use crate::types::{CompletionRequest, CompletionResponse, StreamEvent};

/// Default AI Studio base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-request authentication resolved from the adapter's mode
enum GoogleAuth {
    /// AI Studio API key, attached as a query parameter
    Key(String),
    /// Vertex bearer token from the token supplier
    Bearer(SecretString),
    /// Keyless (custom endpoints)
    None,
}

/// Google Generative Language provider adapter
pub struct GoogleProvider {
    name: String,
    client: Client,
    base_url: Option<Url>,
    api_key: Option<SecretString>,
    vertex: Option<VertexConfig>,
    token_supplier: Option<Arc<dyn TokenSupplier>>,
}

impl GoogleProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with the other
    /// adapters.
    pub fn new(name: String, config: &ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            name,
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            vertex: config.vertex.clone(),
            token_supplier: None,
        })
    }

    /// Attach a bearer-token supplier, switching the adapter to Vertex mode
    #[must_use]
    pub fn with_token_supplier(mut self, supplier: Arc<dyn TokenSupplier>) -> Self {
        self.token_supplier = Some(supplier);
        self
    }

    /// Whether this adapter addresses Vertex rather than AI Studio
    fn is_vertex(&self) -> bool {
        self.token_supplier.is_some() && self.vertex.is_some()
    }

    /// Resolve authentication for one outbound request
    async fn auth(&self, context: &RequestContext) -> Result<GoogleAuth, LlmError> {
        if let Some(supplier) = &self.token_supplier {
            let token = supplier.access_token().await.map_err(LlmError::Internal)?;
            return Ok(GoogleAuth::Bearer(token));
        }
        let key = context.api_key.as_ref().or(self.api_key.as_ref());
        Ok(key.map_or(GoogleAuth::None, |k| GoogleAuth::Key(k.expose_secret().to_owned())))
    }

    /// Build the generate endpoint URL for a model
    fn generate_url(&self, model: &str, streaming: bool, auth: &GoogleAuth) -> String {
        let action = if streaming { "streamGenerateContent" } else { "generateContent" };

        let mut url = if let (true, Some(vertex)) = (self.is_vertex(), self.vertex.as_ref()) {
            let base = self.base_url.as_ref().map_or_else(
                || format!("https://{}-aiplatform.googleapis.com/v1", vertex.location),
                |u| u.as_str().trim_end_matches('/').to_owned(),
            );
            format!(
                "{base}/projects/{}/locations/{}/publishers/google/models/{model}:{action}",
                vertex.project, vertex.location
            )
        } else {
            let base = self
                .base_url
                .as_ref()
                .map_or(DEFAULT_BASE_URL, |u| u.as_str())
                .trim_end_matches('/')
                .to_owned();
            format!("{base}/models/{model}:{action}")
        };

        let mut separator = '?';
        if streaming {
            let _ = write!(url, "{separator}alt=sse");
            separator = '&';
        }
        if let GoogleAuth::Key(key) = auth {
            let _ = write!(url, "{separator}key={key}");
        }

        url
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
        streaming: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let wire_request = encode_request(request);
        let auth = self.auth(context).await?;
        let url = self.generate_url(&request.model, streaming, &auth);

        let mut builder = self.client.post(&url).json(&wire_request);
        if let GoogleAuth::Bearer(token) = &auth {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| send_error(&self.name, &e))?;
        if !response.status().is_success() {
            return Err(api_error(&self.name, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for GoogleProvider {
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
        let response = self.send(request, context, false).await?;

        let wire_response: GoogleResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("invalid generateContent response: {e}")))?;

        Ok(decode_response(wire_response, &request.model))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let response = self.send(request, context, true).await?;

        let event_stream = response.bytes_stream().eventsource();

        let mapped = event_stream
            .map(|result| match result {
                Ok(event) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        return Vec::new();
                    }
                    match serde_json::from_str::<GoogleResponse>(data) {
                        Ok(chunk) => decode_chunk(&chunk).into_iter().map(Ok).collect(),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "skipping unparseable Google SSE chunk");
                            Vec::new()
                        }
                    }
                }
                Err(e) => vec![Err(LlmError::Streaming(e.to_string()))],
            })
            .flat_map(futures_util::stream::iter)
            // Google has no end-of-stream sentinel; synthesize one when the
            // connection closes
            .chain(futures_util::stream::once(async { Ok(StreamEvent::Done) }));

        Ok(Box::pin(mapped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vertex: Option<VertexConfig>, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            provider_type: axon_config::ProviderType::Google,
            api_key: api_key.map(|k| SecretString::from(k.to_owned())),
            base_url: None,
            models: axon_config::ModelConfig::default(),
            vertex,
        }
    }

    #[test]
    fn ai_studio_url_carries_key_as_query_parameter() {
        let provider = GoogleProvider::new("google".to_owned(), &config(None, Some("AIza-test"))).unwrap();
        let auth = GoogleAuth::Key("AIza-test".to_owned());

        let url = provider.generate_url("gemini-2.5-pro", false, &auth);
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent?key=AIza-test"
        );

        let stream_url = provider.generate_url("gemini-2.5-pro", true, &auth);
        assert_eq!(
            stream_url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse&key=AIza-test"
        );
    }

    #[test]
    fn vertex_url_is_project_and_location_scoped() {
        let vertex = VertexConfig {
            project: "my-project".to_owned(),
            location: "us-central1".to_owned(),
        };
        let provider = GoogleProvider::new("google".to_owned(), &config(Some(vertex), None))
            .unwrap()
            .with_token_supplier(Arc::new(axon_core::StaticTokenSupplier::new("ya29.token")));

        let url = provider.generate_url("gemini-2.5-pro", false, &GoogleAuth::Bearer(SecretString::from("t".to_owned())));
        assert_eq!(
            url,
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/gemini-2.5-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn mode_selection_follows_token_supplier() {
        let vertex = VertexConfig {
            project: "p".to_owned(),
            location: "l".to_owned(),
        };

        // Without a supplier the adapter stays in key mode even with vertex
        // scoping configured
        let keyed = GoogleProvider::new("google".to_owned(), &config(Some(vertex.clone()), Some("AIza"))).unwrap();
        assert!(!keyed.is_vertex());
        assert!(matches!(
            keyed.auth(&RequestContext::new()).await.unwrap(),
            GoogleAuth::Key(_)
        ));

        let vertexed = GoogleProvider::new("google".to_owned(), &config(Some(vertex), None))
            .unwrap()
            .with_token_supplier(Arc::new(axon_core::StaticTokenSupplier::new("ya29.token")));
        assert!(vertexed.is_vertex());
        assert!(matches!(
            vertexed.auth(&RequestContext::new()).await.unwrap(),
            GoogleAuth::Bearer(_)
        ));
    }
}
