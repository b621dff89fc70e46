use super::*;
use std::sync::Mutex;

use flowmate_storage::{SessionStatus, SessionSummary};

// ============================================================================
// Scripted provider
// ============================================================================

struct ScriptedProvider {
    reply: Result<String, String>,
    seen: Mutex<Vec<GenerateOptions>>,
}

impl ScriptedProvider {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AiProviderTrait for ScriptedProvider {
    async fn generate(&self, _prompt: &str, options: GenerateOptions) -> anyhow::Result<String> {
        self.seen.lock().unwrap().push(options);
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn oracle(provider: ScriptedProvider) -> LlmOracle {
    LlmOracle::new(Box::new(provider))
}

fn oracle_with_reply(text: &str) -> LlmOracle {
    oracle(ScriptedProvider::replying(text))
}

// ============================================================================
// Response parsing
// ============================================================================

#[test]
fn test_parse_plan_normalises_steps() {
    let response = r#"Sure! Here is the plan:
    {"tasks": [
        {"step": "Collect sources", "duration": 15, "break": 3},
        {"step": "Outline", "duration": 0},
        {"step": "   ", "duration": 20, "break": 5},
        {"name": "Draft intro", "duration": "30", "break": -2}
    ]}"#;

    let steps = parse_plan(response).unwrap();
    assert_eq!(
        steps,
        vec![
            PlannedStep::new("Collect sources", 15, 3),
            PlannedStep::new("Outline", 25, 5),
            PlannedStep::new("Draft intro", 30, 5),
        ]
    );
}

#[test]
fn test_parse_plan_accepts_steps_key_and_bare_array() {
    let steps = parse_plan(r#"{"steps": [{"step": "Read", "duration": 10, "break": 2}]}"#).unwrap();
    assert_eq!(steps.len(), 1);

    let steps = parse_plan(r#"[{"step": "Read", "duration": 10, "break": 2}]"#).unwrap();
    assert_eq!(steps[0].step, "Read");
}

#[test]
fn test_parse_plan_rejects_prose() {
    assert!(matches!(
        parse_plan("I cannot help with that."),
        Err(OracleError::MalformedResponse(_))
    ));
    assert!(parse_plan(r#"{"plan": "later"}"#).is_err());
}

#[test]
fn test_parse_verdict_fills_defaults() {
    let verdict = parse_verdict(r#"```json
{"is_distracted": true, "confidence": 1.7}
```"#)
    .unwrap();
    assert!(verdict.distracted);
    assert_eq!(verdict.reason, "Attention drifting");
    assert_eq!(verdict.confidence, Some(1.0));
}

#[test]
fn test_parse_verdict_requires_flag() {
    assert!(parse_verdict(r#"{"reason": "hmm"}"#).is_err());
}

// ============================================================================
// Oracle behaviour
// ============================================================================

#[tokio::test]
async fn test_plan_failure_yields_empty_plan() {
    let oracle = oracle(ScriptedProvider::failing("503"));
    assert!(oracle.plan("write essay").await.is_empty());

    let oracle = oracle_with_reply("not json at all");
    assert!(oracle.plan("write essay").await.is_empty());
}

#[tokio::test]
async fn test_profile_failure_yields_empty_profile() {
    let oracle = oracle(ScriptedProvider::failing("timeout"));
    assert!(oracle.profile("goal", "step").await.is_empty());
}

#[tokio::test]
async fn test_profile_parses_tokens() {
    let oracle = oracle_with_reply(
        r#"{"allowed_tools": ["notepad"], "keywords": ["draft"], "categories": ["writing"]}"#,
    );
    let profile = oracle.profile("essay", "outline").await;
    assert_eq!(profile.matches("Notepad - draft.txt"), Some("notepad"));
}

#[tokio::test]
async fn test_judge_parses_verdict() {
    let provider = ScriptedProvider::replying(r#"{"is_distracted": false, "reason": "docs"}"#);
    let oracle = LlmOracle::new(Box::new(provider));
    let verdict = oracle
        .judge("goal", "step", &TaskProfile::default(), "Rust docs", "firefox")
        .await
        .unwrap();
    assert!(!verdict.distracted);
    assert_eq!(verdict.reason, "docs");
}

#[tokio::test]
async fn test_judge_options_recorded() {
    let provider = std::sync::Arc::new(ScriptedProvider::replying(r#"{"is_distracted": true}"#));

    struct Shared(std::sync::Arc<ScriptedProvider>);

    #[async_trait]
    impl AiProviderTrait for Shared {
        async fn generate(&self, prompt: &str, options: GenerateOptions) -> anyhow::Result<String> {
            self.0.generate(prompt, options).await
        }

        fn model_name(&self) -> &str {
            self.0.model_name()
        }
    }

    let oracle = LlmOracle::new(Box::new(Shared(provider.clone())));
    oracle
        .judge("goal", "step", &TaskProfile::default(), "title", "proc")
        .await
        .unwrap();

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].json);
    assert_eq!(seen[0].max_tokens, Some(100));
    assert_eq!(seen[0].temperature, Some(0.5));
}

#[tokio::test]
async fn test_judge_provider_error_is_reported() {
    let oracle = oracle(ScriptedProvider::failing("connection refused"));
    let err = oracle
        .judge("goal", "step", &TaskProfile::default(), "title", "proc")
        .await
        .unwrap_err();
    assert!(matches!(err, OracleError::Provider(_)));
}

#[tokio::test]
async fn test_daily_report_skips_provider_on_empty_day() {
    let oracle = oracle(ScriptedProvider::failing("should not be called"));
    let report = oracle.daily_report(&TodayStats::default()).await.unwrap();
    assert_eq!(report, EMPTY_DAY_REPORT);

    let stats = TodayStats {
        sessions: vec![SessionSummary {
            task_name: "Outline".to_string(),
            planned_minutes: 25,
            status: SessionStatus::Completed,
            distraction_count: 0,
        }],
        top_reasons: Vec::new(),
    };
    let oracle = oracle_with_reply("  Solid morning.  ");
    assert_eq!(oracle.daily_report(&stats).await.unwrap(), "Solid morning.");
}
