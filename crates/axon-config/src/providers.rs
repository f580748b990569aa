use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider protocol type
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model filters
    #[serde(default)]
    pub models: ModelConfig,
    /// Vertex project scoping (Google only; requires a token supplier)
    #[serde(default)]
    pub vertex: Option<VertexConfig>,
}

/// Supported provider protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI chat completions API
    Openai,
    /// xAI's OpenAI-compatible API
    Xai,
    /// Anthropic Messages API
    Anthropic,
    /// Google Generative Language / Vertex API
    Google,
}

/// Model filters for a provider
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Serve only models matching these patterns (regex)
    #[serde(default)]
    pub include: Vec<String>,
    /// Never serve models matching these patterns (regex)
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Google Vertex scoping
///
/// Presence of this section together with a registered token supplier
/// switches the Google adapter from API-key mode to bearer-token mode with
/// project/location-scoped URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VertexConfig {
    /// GCP project ID
    pub project: String,
    /// Vertex region (e.g. "us-central1")
    pub location: String,
}
