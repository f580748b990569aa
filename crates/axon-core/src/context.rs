use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

/// Runtime context for a single completion call
///
/// Owns the cancellation signal that threads through the HTTP request, stream
/// consumption, and tool execution of one logical call. Cancelling the token
/// surfaces as a cancellation error, never as a generic failure.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Cancellation signal for this call
    pub cancel: CancellationToken,
    /// User-provided API key that overrides the configured key
    pub api_key: Option<SecretString>,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token and no overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a per-request API key override
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Tie this context to an existing cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
