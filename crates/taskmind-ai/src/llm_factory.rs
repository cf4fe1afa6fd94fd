use crate::llm_provider::*;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::sync::Arc;
use taskmind_core::{LLMConfig, SecretsConfig, KNOWN_PROVIDERS};

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    pub fn create_from_config(
        config: &LLMConfig,
        secrets: &SecretsConfig,
    ) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(anyhow!("LLM is not enabled in configuration"));
        }

        let provider_name = config.provider.to_lowercase();

        let compat_config = match provider_name.as_str() {
            "openai" => Self::openai_config(config, secrets)?,
            "ollama" => OpenAICompatibleConfig::ollama(config.model.clone()),
            "lmstudio" => OpenAICompatibleConfig::lm_studio(config.model.clone()),
            "openai-compatible" => {
                let base_url = config.base_url.clone().ok_or_else(|| {
                    anyhow!("openai-compatible provider requires 'llm.base_url' to be set")
                })?;
                OpenAICompatibleConfig {
                    base_url,
                    model: config.model.clone(),
                    api_key: Self::api_key(secrets),
                    provider_name: "openai-compatible".to_string(),
                    ..Default::default()
                }
            }
            _ => {
                return Err(anyhow!(
                    "Unsupported LLM provider: {}. Available providers: {}",
                    provider_name,
                    KNOWN_PROVIDERS.join(", ")
                ))
            }
        };

        let compat_config = OpenAICompatibleConfig {
            base_url: config
                .base_url
                .clone()
                .unwrap_or(compat_config.base_url),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            ..compat_config
        };

        Ok(Arc::new(OpenAICompatibleProvider::new(compat_config)?))
    }

    fn openai_config(
        config: &LLMConfig,
        secrets: &SecretsConfig,
    ) -> Result<OpenAICompatibleConfig> {
        let api_key = Self::api_key(secrets).ok_or_else(|| {
            anyhow!(
                "OpenAI API key not found. Set 'secrets.openai_api_key' in config \
                 or OPENAI_API_KEY environment variable"
            )
        })?;
        Ok(OpenAICompatibleConfig::openai(config.model.clone(), api_key))
    }

    fn api_key(secrets: &SecretsConfig) -> Option<SecretString> {
        secrets.openai_api_key.clone().or_else(|| {
            std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_llm_is_an_error() {
        let config = LLMConfig {
            enabled: false,
            ..Default::default()
        };
        let result = LLMProviderFactory::create_from_config(&config, &SecretsConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let config = LLMConfig {
            provider: "mystery".into(),
            ..Default::default()
        };
        let err = LLMProviderFactory::create_from_config(&config, &SecretsConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }

    #[test]
    fn local_providers_need_no_key() {
        let config = LLMConfig {
            provider: "ollama".into(),
            model: "llama3.1".into(),
            ..Default::default()
        };
        let provider =
            LLMProviderFactory::create_from_config(&config, &SecretsConfig::default()).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.1");
    }

    #[test]
    fn openai_uses_configured_secret() {
        let config = LLMConfig::default();
        let secrets = SecretsConfig {
            openai_api_key: Some(SecretString::from("sk-test".to_string())),
        };
        let provider = LLMProviderFactory::create_from_config(&config, &secrets).unwrap();
        assert_eq!(provider.provider_name(), "openai");
    }

    #[test]
    fn openai_compatible_requires_base_url() {
        let config = LLMConfig {
            provider: "openai-compatible".into(),
            ..Default::default()
        };
        let result = LLMProviderFactory::create_from_config(&config, &SecretsConfig::default());
        assert!(result.is_err());
    }
}
