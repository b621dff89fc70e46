use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::ai_provider::{AiProviderTrait, GenerateOptions};
use crate::http::ResponseExt;

/// Local Ollama Provider
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url
                .unwrap_or("http://localhost:11434")
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
        }
    }

    fn request_body(&self, prompt: &str, options: GenerateOptions) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt
            }],
            "stream": false
        });
        let mut model_options = serde_json::Map::new();
        if let Some(temperature) = options.temperature {
            model_options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = options.max_tokens {
            model_options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if !model_options.is_empty() {
            body["options"] = serde_json::Value::Object(model_options);
        }
        if options.json {
            body["format"] = json!("json");
        }
        body
    }
}

#[async_trait]
impl AiProviderTrait for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt, options))
            .send()
            .await
            .context("Failed to send request to Ollama")?
            .ensure_success("Ollama")
            .await?;

        let json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        // Extract text from: message.content
        json["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .context("Failed to extract text from Ollama response")
    }

    async fn is_available(&self) -> bool {
        // Check if Ollama is running by hitting /api/tags
        let url = format!("{}/api/tags", self.base_url);
        self.client.get(&url).send().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_map_to_ollama_fields() {
        let provider = OllamaProvider::new(None, "llama3.1");
        let body = provider.request_body("hi", GenerateOptions::json(0.5).with_max_tokens(100));
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 100);
        assert_eq!(body["stream"], false);
    }
}
