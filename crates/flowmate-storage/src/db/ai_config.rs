//! AI Configuration database operations

use anyhow::Result;
use rusqlite::{params, OptionalExtension};

use crate::models::{AiConfig, AiProvider};

use super::Database;

/// Keys accepted by [`Database::update_ai_config_field`]
pub const AI_CONFIG_KEYS: &[&str] = &["provider", "model", "api_key", "base_url", "enabled", "mock"];

impl Database {
    /// Get AI configuration, falling back to defaults when nothing is stored
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub fn get_ai_config(&self) -> Result<AiConfig> {
        let row = self
            .conn()?
            .query_row(
                "SELECT provider, model, api_key, base_url, enabled, mock FROM ai_config WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, bool>(5)?,
                    ))
                },
            )
            .optional()?;

        Ok(match row {
            Some((provider_str, model, api_key, base_url, enabled, mock)) => AiConfig {
                provider: AiProvider::parse_provider(&provider_str).unwrap_or_default(),
                model,
                api_key,
                base_url,
                enabled,
                mock,
            },
            None => AiConfig::default(),
        })
    }

    /// Save AI configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails
    pub fn save_ai_config(&self, config: &AiConfig) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO ai_config (id, provider, model, api_key, base_url, enabled, mock, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                model = excluded.model,
                api_key = excluded.api_key,
                base_url = excluded.base_url,
                enabled = excluded.enabled,
                mock = excluded.mock,
                updated_at = excluded.updated_at",
            params![
                config.provider.to_string(),
                config.model,
                config.api_key,
                config.base_url,
                config.enabled,
                config.mock,
            ],
        )?;
        Ok(())
    }

    /// Update a single AI config field; `None` clears optional fields
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys, unknown providers, or a failed write
    pub fn update_ai_config_field(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut config = self.get_ai_config()?;
        let flag = |v: Option<&str>| v.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        match key {
            "provider" => {
                let raw = value.unwrap_or_default();
                config.provider = AiProvider::parse_provider(raw)
                    .ok_or_else(|| anyhow::anyhow!("Unknown AI provider: {raw}"))?;
            }
            "model" => config.model = value.map(str::to_string),
            "api_key" => config.api_key = value.map(str::to_string),
            "base_url" => config.base_url = value.map(str::to_string),
            "enabled" => config.enabled = flag(value),
            "mock" => config.mock = flag(value),
            _ => anyhow::bail!(
                "Unknown AI config key: {key} (expected one of: {})",
                AI_CONFIG_KEYS.join(", ")
            ),
        }

        self.save_ai_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_row_yields_defaults() {
        let db = Database::open_in_memory().unwrap();
        let config = db.get_ai_config().unwrap();
        assert_eq!(config.provider, AiProvider::OpenAi);
        assert!(config.enabled);
        assert!(!config.mock);
    }

    #[test]
    fn test_field_updates_persist() {
        let db = Database::open_in_memory().unwrap();
        db.update_ai_config_field("provider", Some("ollama")).unwrap();
        db.update_ai_config_field("model", Some("qwen2.5")).unwrap();
        db.update_ai_config_field("mock", Some("true")).unwrap();

        let config = db.get_ai_config().unwrap();
        assert_eq!(config.provider, AiProvider::Ollama);
        assert_eq!(config.effective_model(), "qwen2.5");
        assert!(config.mock);

        db.update_ai_config_field("model", None).unwrap();
        assert_eq!(db.get_ai_config().unwrap().effective_model(), "llama3.1");
    }

    #[test]
    fn test_unknown_key_and_provider_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.update_ai_config_field("temperature", Some("0.2")).is_err());
        assert!(db.update_ai_config_field("provider", Some("skynet")).is_err());
    }
}
