#[cfg(test)]
mod tests;

use std::sync::OnceLock;

use async_trait::async_trait;
use flowmate_storage::TodayStats;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::ai_provider::{AiProviderTrait, GenerateOptions};
use crate::error::OracleError;
use crate::oracle::{
    Oracle, PlannedStep, TaskProfile, Verdict, DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES,
    EMPTY_DAY_REPORT,
};
use crate::prompts;

const PLAN_TEMPERATURE: f32 = 0.7;
const PROFILE_TEMPERATURE: f32 = 0.2;
const JUDGE_TEMPERATURE: f32 = 0.5;
const JUDGE_MAX_TOKENS: u32 = 100;
const REPORT_TEMPERATURE: f32 = 0.7;
const DEFAULT_VERDICT_REASON: &str = "Attention drifting";

/// Oracle backed by a chat-completion provider
pub struct LlmOracle {
    provider: Box<dyn AiProviderTrait>,
}

impl LlmOracle {
    #[must_use]
    pub fn new(provider: Box<dyn AiProviderTrait>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn plan(&self, goal: &str) -> Vec<PlannedStep> {
        let prompt = prompts::plan_prompt(goal);
        match self
            .provider
            .generate(&prompt, GenerateOptions::json(PLAN_TEMPERATURE))
            .await
        {
            Ok(response) => parse_plan(&response).unwrap_or_else(|e| {
                log::warn!("Planner returned unusable output: {e}");
                Vec::new()
            }),
            Err(e) => {
                log::warn!("Planner request failed: {e}");
                Vec::new()
            }
        }
    }

    async fn profile(&self, goal: &str, step: &str) -> TaskProfile {
        let prompt = prompts::profile_prompt(goal, step);
        let response = match self
            .provider
            .generate(&prompt, GenerateOptions::json(PROFILE_TEMPERATURE))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Profile request failed, using empty profile: {e}");
                return TaskProfile::default();
            }
        };

        parse_json::<TaskProfile>(&response).unwrap_or_else(|e| {
            log::warn!("Profile response unusable, using empty profile: {e}");
            TaskProfile::default()
        })
    }

    async fn judge(
        &self,
        goal: &str,
        step: &str,
        profile: &TaskProfile,
        window_title: &str,
        process_name: &str,
    ) -> Result<Verdict, OracleError> {
        let prompt = prompts::judge_prompt(goal, step, profile, window_title, process_name);
        let response = self
            .provider
            .generate(
                &prompt,
                GenerateOptions::json(JUDGE_TEMPERATURE).with_max_tokens(JUDGE_MAX_TOKENS),
            )
            .await?;
        parse_verdict(&response)
    }

    async fn daily_report(&self, stats: &TodayStats) -> Result<String, OracleError> {
        if stats.is_empty() {
            return Ok(EMPTY_DAY_REPORT.to_string());
        }
        let prompt = prompts::report_prompt(stats);
        let report = self
            .provider
            .generate(&prompt, GenerateOptions::text(REPORT_TEMPERATURE))
            .await?;
        Ok(report.trim().to_string())
    }
}

fn json_object_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").ok()).as_ref()
}

/// Parse a JSON value out of a chatty response: the whole text first, then
/// the outermost `{...}` span.
fn parse_json<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T, OracleError> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }
    let candidate = json_object_regex()
        .and_then(|re| re.find(trimmed))
        .map(|m| m.as_str())
        .ok_or_else(|| OracleError::MalformedResponse(truncate(trimmed)))?;
    serde_json::from_str(candidate).map_err(|e| OracleError::MalformedResponse(e.to_string()))
}

fn truncate(text: &str) -> String {
    text.chars().take(80).collect()
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default, alias = "is_distracted")]
    distracted: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

pub(crate) fn parse_verdict(response: &str) -> Result<Verdict, OracleError> {
    let raw: RawVerdict = parse_json(response)?;
    let distracted = raw
        .distracted
        .ok_or_else(|| OracleError::MalformedResponse("missing is_distracted".to_string()))?;
    let reason = raw
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_VERDICT_REASON.to_string());

    Ok(Verdict {
        distracted,
        reason,
        confidence: raw.confidence.map(|c| c.clamp(0.0, 1.0)),
    })
}

/// Accepts `{"tasks": [...]}`, `{"steps": [...]}` or a bare array.
pub(crate) fn parse_plan(response: &str) -> Result<Vec<PlannedStep>, OracleError> {
    let value: Value = parse_json(response)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("tasks")
            .or_else(|| map.get("steps"))
            .and_then(Value::as_array)
            .ok_or_else(|| OracleError::MalformedResponse("no tasks array".to_string()))?,
        _ => return Err(OracleError::MalformedResponse("not an object".to_string())),
    };

    Ok(items.iter().filter_map(normalise_step).collect())
}

/// Steps without a label are dropped; missing or non-positive minutes take defaults.
fn normalise_step(item: &Value) -> Option<PlannedStep> {
    let label = ["step", "name", "task"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|label| !label.is_empty())?;

    Some(PlannedStep::new(
        label,
        positive_minutes(item.get("duration")).unwrap_or(DEFAULT_FOCUS_MINUTES),
        positive_minutes(item.get("break")).unwrap_or(DEFAULT_BREAK_MINUTES),
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_minutes(value: Option<&Value>) -> Option<u32> {
    let minutes = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if minutes.is_finite() && minutes >= 1.0 {
        Some(minutes.round().min(f64::from(u32::MAX)) as u32)
    } else {
        None
    }
}
