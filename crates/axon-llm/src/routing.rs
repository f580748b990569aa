//! Model resolution
//!
//! Maps a requested model name to a configured provider, honoring explicit
//! `provider/model` selection and per-provider include/exclude filters.

use axon_config::AxonConfig;
use regex::Regex;

use crate::error::LlmError;

/// Resolved target for a model request
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    /// Provider name (key in config)
    pub provider_name: String,
    /// Model identifier to send to the provider
    pub model_id: String,
}

/// Compiled include/exclude filters for one provider
#[derive(Debug, Default)]
struct ProviderFilters {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ProviderFilters {
    /// Whether a model passes the filters
    ///
    /// With include patterns set, the model must match at least one; it must
    /// never match an exclude pattern.
    fn allows(&self, model: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(model)) {
            return false;
        }
        !self.exclude.iter().any(|re| re.is_match(model))
    }
}

/// Model routing table
pub struct ModelRouter {
    providers: Vec<(String, ProviderFilters)>,
}

impl ModelRouter {
    /// Build the routing table from configuration, compiling filters once
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` if a configured pattern is not a
    /// valid regex.
    pub fn new(config: &AxonConfig) -> Result<Self, LlmError> {
        let mut providers = Vec::with_capacity(config.providers.len());

        for (name, provider_config) in &config.providers {
            let compile = |patterns: &[String]| -> Result<Vec<Regex>, LlmError> {
                patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| {
                            LlmError::InvalidRequest(format!("provider {name}: invalid model pattern {p:?}: {e}"))
                        })
                    })
                    .collect()
            };

            providers.push((
                name.clone(),
                ProviderFilters {
                    include: compile(&provider_config.models.include)?,
                    exclude: compile(&provider_config.models.exclude)?,
                },
            ));
        }

        Ok(Self { providers })
    }

    /// Resolve a model name to a provider and model identifier
    ///
    /// Supports two formats:
    /// - `provider_name/model_name` -- explicit provider selection
    /// - `model_name` -- first configured provider whose filters allow it
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` for an unknown explicit provider
    /// and `LlmError::ModelNotFound` when no provider serves the model.
    pub fn resolve(&self, model: &str) -> Result<ResolvedModel, LlmError> {
        if let Some((provider_name, model_id)) = model.split_once('/') {
            let Some((name, filters)) = self.providers.iter().find(|(name, _)| name == provider_name) else {
                return Err(LlmError::ProviderNotFound {
                    provider: provider_name.to_owned(),
                });
            };

            if !filters.allows(model_id) {
                return Err(LlmError::ModelNotFound {
                    model: model.to_owned(),
                });
            }

            return Ok(ResolvedModel {
                provider_name: name.clone(),
                model_id: model_id.to_owned(),
            });
        }

        for (name, filters) in &self.providers {
            if filters.allows(model) {
                return Ok(ResolvedModel {
                    provider_name: name.clone(),
                    model_id: model.to_owned(),
                });
            }
        }

        Err(LlmError::ModelNotFound {
            model: model.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> AxonConfig {
        AxonConfig::from_toml(toml).unwrap()
    }

    #[test]
    fn explicit_provider_selection() {
        let router = ModelRouter::new(&config(
            r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-a"

            [providers.claude]
            type = "anthropic"
            api_key = "sk-b"
            "#,
        ))
        .unwrap();

        let resolved = router.resolve("claude/claude-sonnet-4").unwrap();
        assert_eq!(resolved.provider_name, "claude");
        assert_eq!(resolved.model_id, "claude-sonnet-4");
    }

    #[test]
    fn unknown_explicit_provider_fails() {
        let router = ModelRouter::new(&config(
            r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-a"
            "#,
        ))
        .unwrap();

        assert!(matches!(
            router.resolve("nonexistent/some-model"),
            Err(LlmError::ProviderNotFound { provider }) if provider == "nonexistent"
        ));
    }

    #[test]
    fn bare_model_falls_back_to_first_allowing_provider() {
        let router = ModelRouter::new(&config(
            r#"
            [providers.claude]
            type = "anthropic"
            api_key = "sk-a"
            models = { include = ["^claude-"] }

            [providers.openai]
            type = "openai"
            api_key = "sk-b"
            "#,
        ))
        .unwrap();

        assert_eq!(router.resolve("claude-sonnet-4").unwrap().provider_name, "claude");
        // Does not match claude's include filter; lands on openai
        assert_eq!(router.resolve("gpt-4o").unwrap().provider_name, "openai");
    }

    #[test]
    fn exclude_filters_reject_models() {
        let router = ModelRouter::new(&config(
            r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-a"
            models = { exclude = ["-legacy$"] }
            "#,
        ))
        .unwrap();

        assert!(matches!(
            router.resolve("openai/gpt-3-legacy"),
            Err(LlmError::ModelNotFound { .. })
        ));
        assert!(matches!(
            router.resolve("gpt-3-legacy"),
            Err(LlmError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_a_configuration_error() {
        let result = ModelRouter::new(&config(
            r#"
            [providers.openai]
            type = "openai"
            api_key = "sk-a"
            models = { include = ["["] }
            "#,
        ));
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }
}
