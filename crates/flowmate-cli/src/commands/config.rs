/// Configuration management command handlers
use anyhow::{bail, Result};
use flowmate_core::config::{get_data_dir, EngineConfig};
use flowmate_storage::{AiConfig, Database, AI_CONFIG_KEYS};

pub fn handle_config_get(key: &str) -> Result<()> {
    let db = Database::new(None)?;
    let field = ai_field(key)?;
    match ai_value(&db.get_ai_config()?, field) {
        Some(v) => println!("{key} = {v}"),
        None => println!("{key} is not set"),
    }
    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<()> {
    let db = Database::new(None)?;
    let field = ai_field(key)?;
    let value = value.trim();
    let value = if value.is_empty() { None } else { Some(value) };
    db.update_ai_config_field(field, value)?;
    match value {
        Some(v) => println!("Set {key} = {}", mask_secret(field, v)),
        None => println!("Cleared {key}"),
    }
    Ok(())
}

pub fn handle_config_list() -> Result<()> {
    let db = Database::new(None)?;
    let stored = db.get_ai_config()?;
    let effective = stored.clone().with_env_overrides();

    println!("Configuration:");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");

    println!("\n[ai]");
    for field in AI_CONFIG_KEYS {
        let value = ai_value(&stored, field).unwrap_or_else(|| "(unset)".to_string());
        println!("  {field} = {}", mask_secret(field, &value));
    }
    println!(
        "  -> using {} oracle: {} @ {}",
        if effective.is_usable() { "LLM" } else { "mock" },
        effective.effective_model(),
        effective.effective_base_url()
    );

    let config_path = get_data_dir()?.join("config.toml");
    let engine = EngineConfig::load_from(&config_path)?;
    println!("\n[engine] ({})", config_path.display());
    println!("  tick_interval_ms = {}", engine.tick_interval_ms);
    println!("  sample_interval_ms = {}", engine.sample_interval_ms);
    println!("  debounce_secs = {}", engine.debounce_secs);
    println!("  judge_timeout_secs = {}", engine.judge_timeout_secs);
    println!("  profile_timeout_secs = {}", engine.profile_timeout_secs);
    println!("  plan_timeout_secs = {}", engine.plan_timeout_secs);
    println!("  severity_window_secs = {}", engine.severity_window_secs);
    println!("  severity_threshold = {}", engine.severity_threshold);
    println!("  alert_revert_ms = {}", engine.alert_revert_ms);
    println!("  self_identities = {:?}", engine.self_identities);

    Ok(())
}

/// Strip the `ai.` section from `key`; other sections live in config.toml
fn ai_field(key: &str) -> Result<&str> {
    let Some((section, field)) = key.split_once('.') else {
        bail!("Invalid key format. Use: <section>.<key> (e.g., ai.api_key)");
    };
    match section {
        "ai" if AI_CONFIG_KEYS.contains(&field) => Ok(field),
        "ai" => bail!(
            "Unknown AI config key: {field} (expected one of: {})",
            AI_CONFIG_KEYS.join(", ")
        ),
        "engine" => bail!("Engine settings are read from config.toml; edit that file instead"),
        _ => bail!("Unknown config section: {section}"),
    }
}

fn ai_value(config: &AiConfig, field: &str) -> Option<String> {
    match field {
        "provider" => Some(config.provider.to_string()),
        "model" => config.model.clone(),
        "api_key" => config.api_key.clone(),
        "base_url" => config.base_url.clone(),
        "enabled" => Some(config.enabled.to_string()),
        "mock" => Some(config.mock.to_string()),
        _ => None,
    }
}

fn mask_secret(field: &str, value: &str) -> String {
    if field == "api_key" && value != "(unset)" {
        format!("{}***", value.chars().take(8).collect::<String>())
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_field_parsing() {
        assert_eq!(ai_field("ai.model").unwrap(), "model");
        assert_eq!(ai_field("ai.api_key").unwrap(), "api_key");
        assert!(ai_field("model").is_err());
        assert!(ai_field("ai.colour").is_err());
        assert!(ai_field("engine.debounce_secs").is_err());
        assert!(ai_field("plane.api_key").is_err());
    }

    #[test]
    fn test_api_key_is_masked() {
        assert_eq!(mask_secret("api_key", "sk-1234567890"), "sk-12345***");
        assert_eq!(mask_secret("api_key", "(unset)"), "(unset)");
        assert_eq!(mask_secret("model", "deepseek-chat"), "deepseek-chat");
    }

    #[test]
    fn test_ai_values_render_defaults() {
        let config = AiConfig::default();
        assert_eq!(ai_value(&config, "provider").as_deref(), Some("openai"));
        assert_eq!(ai_value(&config, "enabled").as_deref(), Some("true"));
        assert_eq!(ai_value(&config, "model"), None);
    }
}
