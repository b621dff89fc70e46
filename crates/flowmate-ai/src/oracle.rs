//! The attention oracle: planning, task profiling, window judgement and daily reports.

use std::sync::Arc;

use async_trait::async_trait;
use flowmate_storage::{AiConfig, TodayStats};
use serde::{Deserialize, Serialize};

use crate::ai_provider::create_provider;
use crate::error::OracleError;
use crate::llm_oracle::LlmOracle;
use crate::mock::MockOracle;

/// Default focus length for a planned step with no usable duration
pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
/// Default break length for a planned step with no usable break
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// One step proposed by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub step: String,
    /// Focus minutes
    pub duration: u32,
    /// Break minutes
    #[serde(rename = "break")]
    pub break_minutes: u32,
}

impl PlannedStep {
    #[must_use]
    pub fn new(step: impl Into<String>, duration: u32, break_minutes: u32) -> Self {
        Self {
            step: step.into(),
            duration,
            break_minutes,
        }
    }
}

/// What counts as on-task for one step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProfile {
    #[serde(default, alias = "allowed")]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl TaskProfile {
    /// First allowed tool or keyword contained in `text`, case-insensitively.
    ///
    /// Categories are context for the oracle only and never match locally.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.allowed_tools
            .iter()
            .chain(self.keywords.iter())
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .find(|token| haystack.contains(&token.to_lowercase()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed_tools.is_empty() && self.keywords.is_empty() && self.categories.is_empty()
    }
}

/// Oracle judgement of one foreground window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(alias = "is_distracted")]
    pub distracted: bool,
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Source of plans, profiles and verdicts
///
/// Wall-clock budgets are applied by the caller; implementations only need to
/// be cancel-safe.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Break a goal into steps. An empty vector means planning failed.
    async fn plan(&self, goal: &str) -> Vec<PlannedStep>;

    /// Build the profile for one step. Never fails; errors yield an empty profile.
    async fn profile(&self, goal: &str, step: &str) -> TaskProfile;

    /// Judge whether the foreground window serves the current step
    async fn judge(
        &self,
        goal: &str,
        step: &str,
        profile: &TaskProfile,
        window_title: &str,
        process_name: &str,
    ) -> Result<Verdict, OracleError>;

    /// Prose summary of the day
    async fn daily_report(&self, stats: &TodayStats) -> Result<String, OracleError>;
}

/// Text returned by every oracle when nothing has been recorded today
pub const EMPTY_DAY_REPORT: &str = "No focus sessions recorded today yet.";

/// Pick the oracle for a configuration: a provider-backed one when usable,
/// otherwise the offline mock.
#[must_use]
pub fn create_oracle(config: &AiConfig) -> Arc<dyn Oracle> {
    if !config.is_usable() {
        log::info!(
            "Attention oracle running in mock mode (enabled={}, mock={})",
            config.enabled,
            config.mock
        );
        return Arc::new(MockOracle);
    }

    match create_provider(config) {
        Ok(provider) => {
            log::info!(
                "Attention oracle using {} ({})",
                config.provider,
                provider.model_name()
            );
            Arc::new(LlmOracle::new(provider))
        }
        Err(e) => {
            log::warn!("Failed to create AI provider, falling back to mock oracle: {e}");
            Arc::new(MockOracle)
        }
    }
}
