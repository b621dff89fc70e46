use async_trait::async_trait;
use flowmate_storage::TodayStats;

use crate::error::OracleError;
use crate::oracle::{
    Oracle, PlannedStep, TaskProfile, Verdict, DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES,
    EMPTY_DAY_REPORT,
};

/// Deterministic offline oracle, used when no provider is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct MockOracle;

#[async_trait]
impl Oracle for MockOracle {
    async fn plan(&self, goal: &str) -> Vec<PlannedStep> {
        vec![PlannedStep::new(
            format!("Start {}", goal.trim()),
            DEFAULT_FOCUS_MINUTES,
            DEFAULT_BREAK_MINUTES,
        )]
    }

    async fn profile(&self, _goal: &str, _step: &str) -> TaskProfile {
        TaskProfile {
            allowed_tools: vec!["python".to_string(), "vscode".to_string()],
            keywords: vec!["code".to_string()],
            categories: vec!["programming".to_string()],
        }
    }

    async fn judge(
        &self,
        _goal: &str,
        _step: &str,
        _profile: &TaskProfile,
        _window_title: &str,
        _process_name: &str,
    ) -> Result<Verdict, OracleError> {
        Ok(Verdict {
            distracted: true,
            reason: "[mock] off task".to_string(),
            confidence: None,
        })
    }

    async fn daily_report(&self, stats: &TodayStats) -> Result<String, OracleError> {
        if stats.is_empty() {
            return Ok(EMPTY_DAY_REPORT.to_string());
        }
        Ok(format!(
            "[mock] {} sessions, {} focused minutes, {} distractions.",
            stats.sessions.len(),
            stats.completed_minutes(),
            stats.total_distractions()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_plan_is_single_default_step() {
        let steps = MockOracle.plan("write essay").await;
        assert_eq!(steps, vec![PlannedStep::new("Start write essay", 25, 5)]);
    }

    #[tokio::test]
    async fn test_mock_judge_always_distracted() {
        let profile = MockOracle.profile("goal", "step").await;
        assert_eq!(profile.matches("main.py - VSCode"), Some("python"));

        let verdict = MockOracle
            .judge("goal", "step", &profile, "Some Video", "browser")
            .await
            .unwrap();
        assert!(verdict.distracted);
    }

    #[tokio::test]
    async fn test_mock_report_for_empty_day() {
        let report = MockOracle.daily_report(&TodayStats::default()).await.unwrap();
        assert_eq!(report, EMPTY_DAY_REPORT);
    }
}
