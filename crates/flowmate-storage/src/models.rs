use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a focus session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Focus interval is in progress (record still open)
    Running,
    /// Focus interval finished, either by countdown or by the user
    Completed,
    /// Whole run was given up while this record was open
    Abandoned,
    /// Task was removed from the queue while it was executing
    Deleted,
}

impl SessionStatus {
    /// Whether this status closes the record
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Abandoned => write!(f, "ABANDONED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "ABANDONED" => Ok(Self::Abandoned),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(format!("Unknown session status: {s}")),
        }
    }
}

/// One focus interval of one queued task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub task_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub planned_minutes: u32,
    pub status: SessionStatus,
    pub distraction_count: u32,
}

impl SessionRecord {
    #[must_use]
    pub fn new(task_name: String, planned_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_name,
            start_time: Utc::now(),
            end_time: None,
            planned_minutes,
            status: SessionStatus::Running,
            distraction_count: 0,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A distraction logged against a session record. Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistractionRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub process_name: String,
    pub window_title: String,
    pub reason: String,
}

/// Row of today's statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub task_name: String,
    pub planned_minutes: u32,
    pub status: SessionStatus,
    pub distraction_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u32,
}

/// Sessions started today and the most frequent distraction reasons
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodayStats {
    pub sessions: Vec<SessionSummary>,
    pub top_reasons: Vec<ReasonCount>,
}

impl TodayStats {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn total_distractions(&self) -> u32 {
        self.sessions.iter().map(|s| s.distraction_count).sum()
    }

    #[must_use]
    pub fn completed_minutes(&self) -> u32 {
        self.sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .map(|s| s.planned_minutes)
            .sum()
    }
}

/// Backend used by the attention oracle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Any OpenAI-compatible chat completions endpoint (`DeepSeek` by default)
    #[default]
    OpenAi,
    Anthropic,
    Ollama,
}

impl AiProvider {
    /// Parse provider name, accepting a few common spellings
    #[must_use]
    pub fn parse_provider(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" | "deepseek" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    #[must_use]
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "deepseek-chat",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::Ollama => "llama3.1",
        }
    }

    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.deepseek.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Ollama => "http://localhost:11434",
        }
    }

    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Attention oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub enabled: bool,
    /// Use the deterministic offline oracle instead of a provider
    pub mock: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: None,
            api_key: None,
            base_url: None,
            enabled: true,
            mock: false,
        }
    }
}

impl AiConfig {
    #[must_use]
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    #[must_use]
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// True when a real provider can be called with this configuration
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled
            && !self.mock
            && (!self.provider.requires_api_key() || self.effective_api_key().is_some())
    }

    /// Apply `FLOWMATE_*` overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    /// Apply overrides from an arbitrary lookup (environment variables take priority
    /// over stored values)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("FLOWMATE_PROVIDER").and_then(|p| AiProvider::parse_provider(&p)) {
            self.provider = provider;
        }
        if let Some(key) = lookup("FLOWMATE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("FLOWMATE_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(model) = lookup("FLOWMATE_MODEL") {
            self.model = Some(model);
        }
        if let Some(mock) = lookup("FLOWMATE_MOCK_MODE") {
            self.mock = mock.eq_ignore_ascii_case("true") || mock == "1";
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_session_status_roundtrip_through_text() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
            SessionStatus::Deleted,
        ] {
            assert_eq!(status.to_string().parse::<SessionStatus>(), Ok(status));
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_only_running_is_open_status() {
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Deleted.is_terminal());
    }

    #[test]
    fn test_ai_config_defaults_point_at_deepseek() {
        let config = AiConfig::default();
        assert_eq!(config.effective_model(), "deepseek-chat");
        assert_eq!(config.effective_base_url(), "https://api.deepseek.com");
        assert!(!config.is_usable(), "no api key configured");
    }

    #[test]
    fn test_blank_values_fall_back_to_provider_defaults() {
        let config = AiConfig {
            provider: AiProvider::Ollama,
            model: Some("  ".to_string()),
            base_url: Some(String::new()),
            api_key: Some("   ".to_string()),
            ..AiConfig::default()
        };
        assert_eq!(config.effective_model(), "llama3.1");
        assert_eq!(config.effective_base_url(), "http://localhost:11434");
        assert_eq!(config.effective_api_key(), None);
        assert!(config.is_usable(), "ollama needs no key");
    }

    #[test]
    fn test_env_overrides_take_priority() {
        let env: HashMap<&str, &str> = [
            ("FLOWMATE_API_KEY", "sk-env"),
            ("FLOWMATE_MODEL", "gpt-4o-mini"),
            ("FLOWMATE_PROVIDER", "openai"),
            ("FLOWMATE_MOCK_MODE", "TRUE"),
        ]
        .into_iter()
        .collect();

        let mut config = AiConfig {
            provider: AiProvider::Anthropic,
            api_key: Some("sk-stored".to_string()),
            ..AiConfig::default()
        };
        config.apply_overrides(|k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.provider, AiProvider::OpenAi);
        assert_eq!(config.effective_api_key().as_deref(), Some("sk-env"));
        assert_eq!(config.effective_model(), "gpt-4o-mini");
        assert!(config.mock);
        assert!(!config.is_usable(), "mock mode never calls a provider");
    }

    #[test]
    fn test_today_stats_aggregates() {
        let stats = TodayStats {
            sessions: vec![
                SessionSummary {
                    task_name: "outline".to_string(),
                    planned_minutes: 25,
                    status: SessionStatus::Completed,
                    distraction_count: 2,
                },
                SessionSummary {
                    task_name: "draft".to_string(),
                    planned_minutes: 20,
                    status: SessionStatus::Abandoned,
                    distraction_count: 5,
                },
            ],
            top_reasons: Vec::new(),
        };
        assert_eq!(stats.total_distractions(), 7);
        assert_eq!(stats.completed_minutes(), 25);
        assert!(!stats.is_empty());
    }
}
