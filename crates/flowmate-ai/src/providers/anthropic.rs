use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::ai_provider::{AiProviderTrait, GenerateOptions};
use crate::http::ResponseExt;

const DEFAULT_MAX_TOKENS: u32 = 1024;
const JSON_ONLY_SYSTEM: &str = "Reply with a single JSON object and nothing else.";

/// Anthropic Claude API Provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.anthropic.com")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn request_body(&self, prompt: &str, options: GenerateOptions) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        // No native JSON mode; steer with a system prompt instead
        if options.json {
            body["system"] = json!(JSON_ONLY_SYSTEM);
        }
        body
    }
}

#[async_trait]
impl AiProviderTrait for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&self.request_body(prompt, options))
            .send()
            .await
            .context("Failed to send request to Anthropic")?
            .ensure_success("Anthropic")
            .await?;

        let json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        // Extract text from: content[0].text
        json["content"][0]["text"]
            .as_str()
            .map(ToString::to_string)
            .context("Failed to extract text from Anthropic response")
    }
}
