use async_trait::async_trait;
use secrecy::SecretString;

/// Source of short-lived bearer credentials
///
/// Vertex-mode Google requests call this once per outbound request and attach
/// the returned token as a bearer header. Implementations own refresh and
/// caching; the client never inspects token lifetimes.
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    /// Fetch a currently-valid access token
    ///
    /// # Errors
    ///
    /// Returns an error if no valid credential can be produced; the
    /// surrounding request fails without being retried.
    async fn access_token(&self) -> anyhow::Result<SecretString>;
}

/// Supplier that returns a fixed token
///
/// For tests and pre-minted credentials.
pub struct StaticTokenSupplier {
    token: SecretString,
}

impl StaticTokenSupplier {
    /// Wrap a pre-minted token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenSupplier for StaticTokenSupplier {
    async fn access_token(&self) -> anyhow::Result<SecretString> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn static_supplier_returns_its_token() {
        let supplier = StaticTokenSupplier::new("ya29.test");
        let token = supplier.access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "ya29.test");
    }
}
