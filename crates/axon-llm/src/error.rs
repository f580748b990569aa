use std::time::Duration;

use thiserror::Error;

/// Errors produced by completion calls
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested model did not match any configured provider
    #[error("model not found: {model}")]
    ModelNotFound {
        /// The model name as requested
        model: String,
    },

    /// Named provider does not exist in configuration
    #[error("provider not found: {provider}")]
    ProviderNotFound {
        /// The provider name as requested
        provider: String,
    },

    /// Connection-level failure before a response was received
    #[error("connection failed: {0}")]
    Connect(String),

    /// The call exceeded its overall deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Provider returned a non-2xx response
    #[error("provider returned {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
        /// Provider-supplied `Retry-After` hint, in seconds
        retry_after: Option<u64>,
    },

    /// Response body did not match the provider's wire format
    ///
    /// Indicates protocol drift the adapter must be updated for; never
    /// retried.
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// Error while consuming an established response stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Provider lacks a capability the request requires
    #[error("provider {provider} does not support {capability}")]
    Unsupported {
        /// Provider name
        provider: String,
        /// Missing capability
        capability: &'static str,
    },

    /// Request failed validation before being sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Tool loop hit its iteration bound without a terminal response
    #[error("tool loop did not converge after {iterations} iterations")]
    ToolLoopExhausted {
        /// Provider calls made before giving up
        iterations: u32,
    },

    /// The call was cancelled via its request context
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal error; tool executor failures land here
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether the retry pipeline may re-issue the call
    ///
    /// Covers transient transport failures and the retryable HTTP status
    /// set. Parse errors and caller mistakes are terminal.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Provider-supplied retry delay hint, if any
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LlmError {
        LlmError::Api {
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(LlmError::Connect("refused".to_owned()).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(180)).is_retryable());
    }

    #[test]
    fn retryable_status_set_is_exact() {
        for status in [429, 500, 502, 503, 504] {
            assert!(api(status).is_retryable(), "{status} should be retryable");
        }
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!api(status).is_retryable(), "{status} should not be retryable");
        }
    }

    #[test]
    fn parse_and_validation_errors_are_terminal() {
        assert!(!LlmError::Parse("bad json".to_owned()).is_retryable());
        assert!(!LlmError::InvalidRequest("empty".to_owned()).is_retryable());
        assert!(!LlmError::Cancelled.is_retryable());
        assert!(!LlmError::ToolLoopExhausted { iterations: 20 }.is_retryable());
    }

    #[test]
    fn retry_after_surfaces_only_from_api_errors() {
        let hinted = LlmError::Api {
            status: 429,
            body: String::new(),
            retry_after: Some(7),
        };
        assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(api(429).retry_after(), None);
        assert_eq!(LlmError::Connect("x".to_owned()).retry_after(), None);
    }
}
