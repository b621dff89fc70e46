//! Focus session engine runtime.
//!
//! Owns the [`SessionMachine`] behind one lock and drives it from two tasks:
//! a fixed-period countdown ticker and a pump applying monitor reports and
//! alert timeouts. The ticker restarts its phase whenever an interval begins
//! or resumes. Slow oracle calls and record writes never run under the lock.


pub mod events;
pub mod machine;
pub mod queue;
mod records;

use std::sync::Arc;
use std::time::Duration;

use flowmate_ai::Oracle;
use flowmate_storage::SessionStore;
use tokio::sync::{broadcast, mpsc, Mutex, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::attention::{AttentionMonitor, MonitorReport, MonitorSettings};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::sampler::ActivitySampler;

pub use events::{
    AttentionEvent, DisplayState, EngineEvent, EngineStatus, PlanningOutcome, SessionState,
};
pub use machine::SessionMachine;
pub use queue::{Task, TaskDraft, TaskQueue};

const EVENT_CAPACITY: usize = 256;

pub struct FocusEngine {
    machine: Arc<Mutex<SessionMachine>>,
    oracle: Arc<dyn Oracle>,
    events: broadcast::Sender<EngineEvent>,
    plan_timeout: Duration,
    cancel_token: CancellationToken,
}

impl FocusEngine {
    /// Build the engine and spawn its background tasks on the current runtime
    #[must_use]
    pub fn start(
        config: &EngineConfig,
        store: Arc<dyn SessionStore>,
        oracle: Arc<dyn Oracle>,
        sampler: Arc<dyn ActivitySampler>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();

        let monitor = AttentionMonitor::new(
            sampler,
            oracle.clone(),
            MonitorSettings::from(config),
            report_tx,
        );
        let machine = SessionMachine::new(config, store, monitor, events.clone(), alert_tx);
        let realign = machine.tick_realign();
        let machine = Arc::new(Mutex::new(machine));

        let cancel_token = CancellationToken::new();
        tokio::spawn(run_ticker(
            machine.clone(),
            realign,
            config.tick_interval(),
            cancel_token.clone(),
        ));
        tokio::spawn(run_signal_pump(
            machine.clone(),
            report_rx,
            alert_rx,
            cancel_token.clone(),
        ));

        Self {
            machine,
            oracle,
            events,
            plan_timeout: config.plan_timeout(),
            cancel_token,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Ask the oracle for a plan for `goal`; the plan waits for [`Self::confirm_plan`]
    ///
    /// # Errors
    ///
    /// `SessionActive` while a session runs, `PlanningFailed` when no steps came back
    pub async fn start_session(&self, goal: &str) -> Result<Vec<Task>, EngineError> {
        let goal = goal.trim();
        if self.machine.lock().await.state() != SessionState::Idle {
            return Err(EngineError::SessionActive);
        }
        if goal.is_empty() {
            return Err(EngineError::PlanningFailed);
        }

        log::info!("Planning '{goal}'");
        let steps = match tokio::time::timeout(self.plan_timeout, self.oracle.plan(goal)).await {
            Ok(steps) => steps,
            Err(_) => {
                log::warn!("Planner timed out after {:?}", self.plan_timeout);
                Vec::new()
            }
        };
        let tasks: Vec<Task> = steps.iter().map(Task::from).collect();

        self.machine.lock().await.record_plan(goal, tasks.clone());
        if tasks.is_empty() {
            Err(EngineError::PlanningFailed)
        } else {
            Ok(tasks)
        }
    }

    /// # Errors
    ///
    /// See [`SessionMachine::confirm_plan`]
    pub async fn confirm_plan(&self, tasks: Vec<TaskDraft>) -> Result<(), EngineError> {
        self.machine.lock().await.confirm_plan(tasks)
    }

    /// # Errors
    ///
    /// See [`SessionMachine::edit_queue`]
    pub async fn edit_queue(&self, tasks: Vec<TaskDraft>) -> Result<(), EngineError> {
        self.machine.lock().await.edit_queue(tasks)
    }

    /// # Errors
    ///
    /// See [`SessionMachine::complete_step`]
    pub async fn complete_step(&self) -> Result<(), EngineError> {
        self.machine.lock().await.complete_step()
    }

    /// # Errors
    ///
    /// See [`SessionMachine::abandon`]
    pub async fn abandon(&self) -> Result<(), EngineError> {
        self.machine.lock().await.abandon()
    }

    /// # Errors
    ///
    /// See [`SessionMachine::set_task_pause`]
    pub async fn set_task_pause(&self, paused: bool) -> Result<(), EngineError> {
        self.machine.lock().await.set_task_pause(paused)
    }

    pub async fn set_supervision_pause(&self, paused: bool) {
        self.machine.lock().await.set_supervision_pause(paused);
    }

    pub async fn status(&self) -> EngineStatus {
        self.machine.lock().await.status()
    }

    /// Queued tasks and the index of the current one
    pub async fn queue(&self) -> (Vec<Task>, Option<usize>) {
        self.machine.lock().await.queue()
    }

    /// Plan waiting for confirmation, empty when there is none
    pub async fn pending_plan(&self) -> Vec<Task> {
        self.machine.lock().await.pending_plan()
    }

    /// Stop background tasks and close any open session record
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let flushed = {
            let mut machine = self.machine.lock().await;
            machine.shutdown();
            machine.flush_records()
        };
        if flushed.await.is_err() {
            log::warn!("Record writer stopped before shutdown");
        }
        log::info!("Focus engine stopped");
    }
}

impl Drop for FocusEngine {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn run_ticker(
    machine: Arc<Mutex<SessionMachine>>,
    realign: Arc<Notify>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            // A new interval gets a full first unit
            () = realign.notified() => ticker.reset(),
            _ = ticker.tick() => machine.lock().await.tick(),
        }
    }
}

async fn run_signal_pump(
    machine: Arc<Mutex<SessionMachine>>,
    mut reports: mpsc::UnboundedReceiver<MonitorReport>,
    mut alerts: mpsc::UnboundedReceiver<u64>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            Some(report) = reports.recv() => machine.lock().await.apply_report(report),
            Some(epoch) = alerts.recv() => machine.lock().await.alert_elapsed(epoch),
            else => break,
        }
    }
}
