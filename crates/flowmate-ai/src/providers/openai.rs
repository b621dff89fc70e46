use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::ai_provider::{AiProviderTrait, GenerateOptions};
use crate::http::ResponseExt;

/// OpenAI-compatible chat completions provider (`DeepSeek`, `OpenAI`, local gateways)
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.deepseek.com")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn request_body(&self, prompt: &str, options: GenerateOptions) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if options.json {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl AiProviderTrait for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(prompt, options))
            .send()
            .await
            .context("Failed to send request to OpenAI-compatible endpoint")?
            .ensure_success("OpenAI")
            .await?;

        let json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        // Extract text from: choices[0].message.content
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .context("Failed to extract text from OpenAI response")
    }
}
