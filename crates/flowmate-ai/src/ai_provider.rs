use anyhow::{Context, Result};
use async_trait::async_trait;
use flowmate_storage::{AiConfig, AiProvider};

use crate::providers::{
    anthropic::AnthropicProvider, ollama::OllamaProvider, openai::OpenAiProvider,
};

/// Per-call sampling knobs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider to answer with a single JSON object
    pub json: bool,
}

impl GenerateOptions {
    #[must_use]
    pub const fn json(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
            json: true,
        }
    }

    #[must_use]
    pub const fn text(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
            json: false,
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for AI providers
#[async_trait]
pub trait AiProviderTrait: Send + Sync {
    /// Generate text response for a given prompt
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Check if the provider is available
    async fn is_available(&self) -> bool {
        true
    }
}

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns an error if the API key is missing for providers that require one
/// (`OpenAI`-compatible, Anthropic).
pub fn create_provider(config: &AiConfig) -> Result<Box<dyn AiProviderTrait>> {
    let model = config.effective_model();
    let base_url = config.effective_base_url();

    match config.provider {
        AiProvider::OpenAi => {
            let api_key = config
                .effective_api_key()
                .context("API Key required for OpenAI-compatible provider")?;
            Ok(Box::new(OpenAiProvider::new(&api_key, model, Some(base_url))))
        }
        AiProvider::Anthropic => {
            let api_key = config
                .effective_api_key()
                .context("API Key required for Anthropic")?;
            Ok(Box::new(AnthropicProvider::new(&api_key, model, Some(base_url))))
        }
        AiProvider::Ollama => Ok(Box::new(OllamaProvider::new(Some(base_url), model))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_requires_key_for_hosted_providers() {
        let config = AiConfig::default();
        assert!(create_provider(&config).is_err());

        let config = AiConfig {
            provider: AiProvider::Anthropic,
            ..AiConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_create_provider_uses_effective_model() {
        let config = AiConfig {
            api_key: Some("sk-test".to_string()),
            ..AiConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "deepseek-chat");

        let config = AiConfig {
            provider: AiProvider::Ollama,
            model: Some("qwen2.5".to_string()),
            ..AiConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "qwen2.5");
    }

    #[test]
    fn test_generate_options_builders() {
        let options = GenerateOptions::json(0.5).with_max_tokens(100);
        assert!(options.json);
        assert_eq!(options.max_tokens, Some(100));
        assert!(!GenerateOptions::text(0.7).json);
    }
}
