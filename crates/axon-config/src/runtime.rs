use serde::Deserialize;

/// Retry pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RetryConfig {
    /// Attempts per logical call, first try included
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds
    pub base_delay_ms: u64,
    /// Ceiling for a single backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier
    pub multiplier: f64,
    /// Overall deadline per logical call in seconds, backoff included
    pub call_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            call_timeout_secs: 180,
        }
    }
}

/// Tool-calling loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolLoopConfig {
    /// Provider calls allowed before the loop fails with exhaustion
    pub max_iterations: u32,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}
