//! Test doubles shared by the engine and monitor suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use flowmate_ai::{Oracle, OracleError, PlannedStep, TaskProfile, Verdict};
use flowmate_storage::{SessionStatus, SessionStore, TodayStats};
use uuid::Uuid;

use crate::sampler::{ActivitySample, ActivitySampler};

// ============================================================================
// Sampler
// ============================================================================

/// Replays samples in order, then repeats the last one forever
pub struct ScriptedSampler {
    samples: Mutex<VecDeque<ActivitySample>>,
    last: Mutex<ActivitySample>,
}

impl ScriptedSampler {
    pub fn new(samples: &[(&str, &str)]) -> Self {
        let samples: VecDeque<_> = samples
            .iter()
            .map(|(title, process)| ActivitySample::new(*title, *process))
            .collect();
        Self {
            samples: Mutex::new(samples),
            last: Mutex::new(ActivitySample::unknown()),
        }
    }

    pub fn fixed(title: &str, process: &str) -> Self {
        Self::new(&[(title, process)])
    }
}

#[async_trait]
impl ActivitySampler for ScriptedSampler {
    async fn current(&self) -> ActivitySample {
        let next = self.samples.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(sample) = next {
            *last = sample;
        }
        last.clone()
    }
}

// ============================================================================
// Oracle
// ============================================================================

pub struct ScriptedOracle {
    plan: Vec<PlannedStep>,
    profile: TaskProfile,
    verdict: Option<Verdict>,
    profile_delay: Duration,
    judge_delay: Duration,
    judge_calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Judges everything on task, with an empty profile
    pub fn new() -> Self {
        Self {
            plan: Vec::new(),
            profile: TaskProfile::default(),
            verdict: Some(Verdict {
                distracted: false,
                reason: "on task".to_string(),
                confidence: None,
            }),
            profile_delay: Duration::ZERO,
            judge_delay: Duration::ZERO,
            judge_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_plan(mut self, steps: &[(&str, u32, u32)]) -> Self {
        self.plan = steps
            .iter()
            .map(|(step, focus, brk)| PlannedStep::new(*step, *focus, *brk))
            .collect();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.profile.keywords = keywords.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_verdict(mut self, distracted: bool, reason: &str) -> Self {
        self.verdict = Some(Verdict {
            distracted,
            reason: reason.to_string(),
            confidence: Some(0.9),
        });
        self
    }

    /// Every judge call fails with a provider error
    pub fn failing(mut self) -> Self {
        self.verdict = None;
        self
    }

    pub fn with_judge_delay(mut self, delay: Duration) -> Self {
        self.judge_delay = delay;
        self
    }

    pub fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = delay;
        self
    }

    pub fn judge_calls(&self) -> usize {
        self.judge_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn plan(&self, _goal: &str) -> Vec<PlannedStep> {
        self.plan.clone()
    }

    async fn profile(&self, _goal: &str, _step: &str) -> TaskProfile {
        if !self.profile_delay.is_zero() {
            tokio::time::sleep(self.profile_delay).await;
        }
        self.profile.clone()
    }

    async fn judge(
        &self,
        _goal: &str,
        _step: &str,
        _profile: &TaskProfile,
        _window_title: &str,
        _process_name: &str,
    ) -> Result<Verdict, OracleError> {
        self.judge_calls.fetch_add(1, Ordering::SeqCst);
        if !self.judge_delay.is_zero() {
            tokio::time::sleep(self.judge_delay).await;
        }
        self.verdict
            .clone()
            .ok_or_else(|| OracleError::Provider(anyhow!("provider unreachable")))
    }

    async fn daily_report(&self, _stats: &TodayStats) -> Result<String, OracleError> {
        Ok("report".to_string())
    }
}

// ============================================================================
// Session store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Start { task: String, minutes: u32 },
    End { id: Uuid, status: SessionStatus },
    Distraction { id: Uuid, reason: String },
}

#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<StoreCall>>,
    fail: bool,
}

impl RecordingStore {
    /// Store whose every call errors
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn end_statuses(&self) -> Vec<SessionStatus> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::End { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn started_tasks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Start { task, .. } => Some(task),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: StoreCall) -> Result<()> {
        if self.fail {
            return Err(anyhow!("disk full"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl SessionStore for RecordingStore {
    fn start_session(&self, task_name: &str, planned_minutes: u32) -> Result<Uuid> {
        self.push(StoreCall::Start {
            task: task_name.to_string(),
            minutes: planned_minutes,
        })?;
        Ok(Uuid::new_v4())
    }

    fn end_session(&self, session_id: Uuid, status: SessionStatus) -> Result<()> {
        self.push(StoreCall::End {
            id: session_id,
            status,
        })
    }

    fn log_distraction(
        &self,
        session_id: Uuid,
        _process_name: &str,
        _window_title: &str,
        reason: &str,
    ) -> Result<()> {
        self.push(StoreCall::Distraction {
            id: session_id,
            reason: reason.to_string(),
        })
    }

    fn today_stats(&self) -> Result<TodayStats> {
        Ok(TodayStats::default())
    }
}
