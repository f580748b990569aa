//! Configuration for the Axon completion client
//!
//! Deserialized from TOML; secrets are wrapped in [`secrecy::SecretString`]
//! so they never appear in debug output.

#![allow(clippy::must_use_candidate)]

mod loader;
pub mod providers;
pub mod runtime;

use indexmap::IndexMap;
use serde::Deserialize;

pub use providers::{ModelConfig, ProviderConfig, ProviderType, VertexConfig};
pub use runtime::{RetryConfig, ToolLoopConfig};

/// Top-level Axon configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxonConfig {
    /// Provider configurations keyed by name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Retry pipeline settings
    #[serde(default)]
    pub retry: RetryConfig,
    /// Tool-calling loop settings
    #[serde(default)]
    pub tool_loop: ToolLoopConfig,
}
