//! Attention monitor: samples the foreground window while a task is in FOCUS
//! and classifies it as on-task or distracting.


pub mod fast_path;

use std::sync::Arc;
use std::time::Duration;

use flowmate_ai::{Oracle, OracleError, TaskProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::sampler::{ActivitySample, ActivitySampler};

/// Which step of the classification pipeline produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictSource {
    SelfExempt,
    System,
    /// Task profile not available yet
    Loading,
    ProfileMatch,
    Oracle,
    KeywordFallback,
    OracleError,
}

impl std::fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::SelfExempt => "self",
            Self::System => "system",
            Self::Loading => "loading",
            Self::ProfileMatch => "profile match",
            Self::Oracle => "oracle",
            Self::KeywordFallback => "keyword fallback",
            Self::OracleError => "error",
        };
        f.write_str(tag)
    }
}

/// One classified sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub process: String,
    pub title: String,
    pub distracted: bool,
    pub reason: String,
    pub source: VerdictSource,
}

/// A monitor event tagged with the run that produced it
#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub generation: u64,
    pub event: MonitorEvent,
}

/// Immutable snapshot of the task a monitor run watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorContext {
    pub goal: String,
    pub step: String,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub sample_interval: Duration,
    pub debounce: Duration,
    pub judge_timeout: Duration,
    pub profile_timeout: Duration,
    pub self_identities: Vec<String>,
}

impl From<&EngineConfig> for MonitorSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_interval: config.sample_interval(),
            debounce: config.debounce(),
            judge_timeout: config.judge_timeout(),
            profile_timeout: config.profile_timeout(),
            self_identities: config.self_identities.clone(),
        }
    }
}

/// Starts and stops monitor runs
///
/// Every start and every stop bumps the generation, so reports from a
/// superseded run can be recognised and dropped by the consumer.
pub struct AttentionMonitor {
    sampler: Arc<dyn ActivitySampler>,
    oracle: Arc<dyn Oracle>,
    settings: Arc<MonitorSettings>,
    reports: mpsc::UnboundedSender<MonitorReport>,
    generation: u64,
    cancel_token: Option<CancellationToken>,
}

impl AttentionMonitor {
    #[must_use]
    pub fn new(
        sampler: Arc<dyn ActivitySampler>,
        oracle: Arc<dyn Oracle>,
        settings: MonitorSettings,
        reports: mpsc::UnboundedSender<MonitorReport>,
    ) -> Self {
        Self {
            sampler,
            oracle,
            settings: Arc::new(settings),
            reports,
            generation: 0,
            cancel_token: None,
        }
    }

    /// Start a run for `context`, stopping any current run first.
    /// Returns the new generation.
    pub fn start(&mut self, context: MonitorContext) -> u64 {
        self.stop();
        self.generation += 1;

        let cancel_token = CancellationToken::new();
        log::info!(
            "Attention monitor {} started for step '{}'",
            self.generation,
            context.step
        );

        let classifier = Classifier::new(self.oracle.clone(), self.settings.clone(), context);
        tokio::spawn(monitor_loop(
            self.generation,
            classifier,
            self.sampler.clone(),
            self.reports.clone(),
            cancel_token.clone(),
        ));

        self.cancel_token = Some(cancel_token);
        self.generation
    }

    /// Request the current run to stop; in-flight oracle calls are abandoned
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
            self.generation += 1;
            log::debug!("Attention monitor stopped (generation now {})", self.generation);
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// True when `generation` belongs to the run that is active right now
    #[must_use]
    pub const fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }
}

impl Drop for AttentionMonitor {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn monitor_loop(
    generation: u64,
    mut classifier: Classifier,
    sampler: Arc<dyn ActivitySampler>,
    reports: mpsc::UnboundedSender<MonitorReport>,
    cancel_token: CancellationToken,
) {
    let profile_fut = classifier.fetch_profile();
    tokio::pin!(profile_fut);
    let mut profile_pending = true;

    let mut ticker = tokio::time::interval(classifier.settings.sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            profile = &mut profile_fut, if profile_pending => {
                profile_pending = false;
                if profile.is_empty() {
                    log::debug!("Monitor {generation} profile is empty, the oracle judges every window");
                } else {
                    log::debug!(
                        "Monitor {generation} profile ready: {} tools, {} keywords",
                        profile.allowed_tools.len(),
                        profile.keywords.len()
                    );
                }
                classifier.profile = Some(profile);
            }
            _ = ticker.tick() => {
                let event = tokio::select! {
                    biased;
                    () = cancel_token.cancelled() => break,
                    event = sample_and_classify(sampler.as_ref(), &mut classifier) => event,
                };
                if let Some(event) = event {
                    if reports.send(MonitorReport { generation, event }).is_err() {
                        break;
                    }
                }
            }
        }
    }

    log::debug!("Attention monitor {generation} exited");
}

async fn sample_and_classify(
    sampler: &dyn ActivitySampler,
    classifier: &mut Classifier,
) -> Option<MonitorEvent> {
    let sample = sampler.current().await;
    classifier.classify(&sample).await
}

/// Per-run classification state
struct Classifier {
    oracle: Arc<dyn Oracle>,
    settings: Arc<MonitorSettings>,
    context: MonitorContext,
    profile: Option<TaskProfile>,
    /// Title and time of the last definitive verdict
    last_classified: Option<(String, Instant)>,
}

impl Classifier {
    fn new(oracle: Arc<dyn Oracle>, settings: Arc<MonitorSettings>, context: MonitorContext) -> Self {
        Self {
            oracle,
            settings,
            context,
            profile: None,
            last_classified: None,
        }
    }

    /// Profile request for this run; falls back to an empty profile on timeout
    fn fetch_profile(&self) -> impl std::future::Future<Output = TaskProfile> + Send + 'static {
        let oracle = self.oracle.clone();
        let timeout = self.settings.profile_timeout;
        let MonitorContext { goal, step } = self.context.clone();
        async move {
            match tokio::time::timeout(timeout, oracle.profile(&goal, &step)).await {
                Ok(profile) => profile,
                Err(_) => {
                    log::warn!("Task profile request timed out after {timeout:?}, using empty profile");
                    TaskProfile::default()
                }
            }
        }
    }

    /// Returns `None` when the sample is debounced
    async fn classify(&mut self, sample: &ActivitySample) -> Option<MonitorEvent> {
        let text = sample.combined_lowercase();
        let event = |distracted: bool, reason: String, source: VerdictSource| MonitorEvent {
            process: sample.process.clone(),
            title: sample.title.clone(),
            distracted,
            reason,
            source,
        };

        if fast_path::is_self(sample, &self.settings.self_identities) {
            self.remember(sample);
            return Some(event(false, "FlowMate itself".to_string(), VerdictSource::SelfExempt));
        }

        if fast_path::is_system(&text) {
            self.remember(sample);
            return Some(event(false, "System".to_string(), VerdictSource::System));
        }

        let Some(profile) = self.profile.as_ref() else {
            return Some(event(false, "Loading...".to_string(), VerdictSource::Loading));
        };

        if let Some(token) = profile.matches(&text) {
            let reason = format!("Matched profile: {token}");
            self.remember(sample);
            return Some(event(false, reason, VerdictSource::ProfileMatch));
        }

        if self.is_debounced(sample) {
            return None;
        }

        let judged = tokio::time::timeout(
            self.settings.judge_timeout,
            self.oracle.judge(
                &self.context.goal,
                &self.context.step,
                profile,
                &sample.title,
                &sample.process,
            ),
        )
        .await
        .unwrap_or(Err(OracleError::Timeout(self.settings.judge_timeout)));

        let classified = match judged {
            Ok(verdict) => event(verdict.distracted, verdict.reason, VerdictSource::Oracle),
            Err(e) => {
                log::warn!("Oracle judgement failed, using keyword fallback: {e}");
                let (distracted, reason) = fast_path::keyword_fallback(&text);
                let source = if distracted {
                    VerdictSource::KeywordFallback
                } else {
                    VerdictSource::OracleError
                };
                event(distracted, reason.to_string(), source)
            }
        };

        self.remember(sample);
        Some(classified)
    }

    fn is_debounced(&self, sample: &ActivitySample) -> bool {
        self.last_classified.as_ref().is_some_and(|(title, at)| {
            *title == sample.title && at.elapsed() < self.settings.debounce
        })
    }

    fn remember(&mut self, sample: &ActivitySample) {
        self.last_classified = Some((sample.title.clone(), Instant::now()));
    }
}
