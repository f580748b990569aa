use std::path::Path;

use crate::{AxonConfig, ProviderType};

impl AxonConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails, or
    /// validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if TOML parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, a provider lacks
    /// credentials, or Vertex scoping is applied to a non-Google provider
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        for (name, provider) in &self.providers {
            if provider.vertex.is_some() && provider.provider_type != ProviderType::Google {
                anyhow::bail!("provider {name}: vertex scoping is only valid for google providers");
            }

            // Vertex-mode credentials come from a token supplier at
            // construction time, not from the config file
            if provider.api_key.is_none() && provider.vertex.is_none() && provider.base_url.is_none() {
                anyhow::bail!("provider {name}: an api_key is required (or a base_url for keyless endpoints)");
            }
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        if self.tool_loop.max_iterations == 0 {
            anyhow::bail!("tool_loop.max_iterations must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use crate::{AxonConfig, ProviderType};

    #[test]
    fn parses_full_provider_table() {
        let config = AxonConfig::from_toml(indoc! {r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-test"

            [providers.grok]
            type = "xai"
            api_key = "xai-test"
            base_url = "https://api.x.ai/v1"

            [providers.claude]
            type = "anthropic"
            api_key = "sk-ant-test"
            models = { include = ["^claude-"], exclude = ["-legacy$"] }

            [providers.gemini]
            type = "google"
            vertex = { project = "my-project", location = "us-central1" }
        "#})
        .unwrap();

        assert_eq!(config.providers.len(), 4);
        assert_eq!(config.providers["openai"].provider_type, ProviderType::Openai);
        assert_eq!(config.providers["grok"].provider_type, ProviderType::Xai);
        assert_eq!(
            config.providers["openai"].api_key.as_ref().unwrap().expose_secret(),
            "sk-test"
        );
        assert_eq!(config.providers["claude"].models.include, vec!["^claude-"]);

        let vertex = config.providers["gemini"].vertex.as_ref().unwrap();
        assert_eq!(vertex.project, "my-project");
        assert_eq!(vertex.location, "us-central1");
    }

    #[test]
    fn retry_and_tool_loop_defaults() {
        let config = AxonConfig::from_toml(indoc! {r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-test"
        "#})
        .unwrap();

        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.retry.call_timeout_secs, 180);
        assert_eq!(config.tool_loop.max_iterations, 20);
    }

    #[test]
    fn rejects_empty_provider_table() {
        let err = AxonConfig::from_toml("").unwrap_err();
        assert!(err.to_string().contains("at least one provider"));
    }

    #[test]
    fn rejects_vertex_on_non_google_provider() {
        let err = AxonConfig::from_toml(indoc! {r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-test"
            vertex = { project = "p", location = "l" }
        "#})
        .unwrap_err();
        assert!(err.to_string().contains("only valid for google"));
    }

    #[test]
    fn rejects_provider_without_credentials() {
        let err = AxonConfig::from_toml(indoc! {r#"
            [providers.openai]
            type = "openai"
        "#})
        .unwrap_err();
        assert!(err.to_string().contains("api_key is required"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = AxonConfig::from_toml(indoc! {r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-test"
            organization = "org-123"
        "#});
        assert!(result.is_err());
    }
}
