//! Session state machine: IDLE -> FOCUS -> BREAK -> ... -> IDLE.
//!
//! Every mutation of the queue and the countdown happens here, under the
//! single lock held by [`super::FocusEngine`]. Session record writes are only
//! queued from here.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flowmate_storage::{SessionStatus, SessionStore};
use tokio::sync::{broadcast, mpsc, oneshot, Notify};
use uuid::Uuid;

use super::events::{
    AttentionEvent, DisplayState, EngineEvent, EngineStatus, PlanningOutcome, SessionState,
};
use super::queue::{tasks_from_drafts, Task, TaskDraft, TaskQueue};
use super::records::RecordWriter;
use crate::attention::{AttentionMonitor, MonitorContext, MonitorEvent, MonitorReport};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::severity::SeverityTracker;

pub struct SessionMachine {
    records: RecordWriter,
    /// Restarts the countdown phase when an interval begins or resumes
    realign: Arc<Notify>,
    monitor: AttentionMonitor,
    severity: SeverityTracker,
    events: broadcast::Sender<EngineEvent>,
    alerts: mpsc::UnboundedSender<u64>,
    alert_revert: Duration,

    state: SessionState,
    display: DisplayState,
    queue: TaskQueue,
    remaining_secs: u64,
    task_paused: bool,
    /// User preference; survives task changes
    supervision_paused: bool,
    goal: Option<String>,
    pending_goal: Option<String>,
    pending_plan: Vec<Task>,
    /// Key of the open session record
    session_id: Option<Uuid>,
    distraction_count: u32,
    alert_epoch: u64,
    last_attention: Option<AttentionEvent>,
}

impl SessionMachine {
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn SessionStore>,
        monitor: AttentionMonitor,
        events: broadcast::Sender<EngineEvent>,
        alerts: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            records: RecordWriter::spawn(store),
            realign: Arc::new(Notify::new()),
            monitor,
            severity: SeverityTracker::new(config.severity_window(), config.severity_threshold),
            events,
            alerts,
            alert_revert: config.alert_revert(),
            state: SessionState::Idle,
            display: DisplayState::Idle,
            queue: TaskQueue::default(),
            remaining_secs: 0,
            task_paused: false,
            supervision_paused: false,
            goal: None,
            pending_goal: None,
            pending_plan: Vec::new(),
            session_id: None,
            distraction_count: 0,
            alert_epoch: 0,
            last_attention: None,
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Remember a planner result for a later confirmation. An empty plan is
    /// reported as a planning failure.
    pub fn record_plan(&mut self, goal: &str, tasks: Vec<Task>) {
        if tasks.is_empty() {
            self.pending_goal = None;
            self.pending_plan.clear();
            self.emit(EngineEvent::Planning(PlanningOutcome::Failed));
            return;
        }
        self.pending_goal = Some(goal.to_string());
        self.pending_plan.clone_from(&tasks);
        self.emit(EngineEvent::Planning(PlanningOutcome::Ready(tasks)));
    }

    /// Load a confirmed plan and start its first task
    ///
    /// # Errors
    ///
    /// `SessionActive` while a session runs, `EmptyPlan` when no usable task remains
    pub fn confirm_plan(&mut self, drafts: Vec<TaskDraft>) -> Result<(), EngineError> {
        if self.state != SessionState::Idle {
            return Err(EngineError::SessionActive);
        }
        let tasks = tasks_from_drafts(drafts);
        let Some(first) = tasks.first() else {
            return Err(EngineError::EmptyPlan);
        };

        let goal = self.pending_goal.take().unwrap_or_else(|| first.step.clone());
        log::info!("Starting '{goal}' with {} tasks", tasks.len());
        self.goal = Some(goal);
        self.pending_plan.clear();
        self.queue.replace(tasks);
        self.load_task(0, false);
        Ok(())
    }

    /// Finish the current interval early: FOCUS -> BREAK, BREAK -> next task
    ///
    /// # Errors
    ///
    /// `NotActive` when idle
    pub fn complete_step(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Idle => Err(EngineError::NotActive),
            SessionState::Focus => {
                self.enter_break();
                Ok(())
            }
            SessionState::Break => {
                let next = self.queue.current_index().map_or(0, |i| i + 1);
                self.load_task(next, true);
                Ok(())
            }
        }
    }

    /// Drop the whole session and flash the alert display
    ///
    /// # Errors
    ///
    /// `NotActive` when idle
    pub fn abandon(&mut self) -> Result<(), EngineError> {
        if self.state == SessionState::Idle {
            return Err(EngineError::NotActive);
        }
        if let Some(task) = self.queue.current() {
            log::info!("Abandoning session at '{}'", task.step);
        }

        self.close_record(SessionStatus::Abandoned);
        self.monitor.stop();
        self.reset_session();

        self.display = DisplayState::Alert;
        self.alert_epoch += 1;
        let epoch = self.alert_epoch;
        let alerts = self.alerts.clone();
        let delay = self.alert_revert;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = alerts.send(epoch);
        });

        self.emit_state();
        Ok(())
    }

    /// Revert the alert display unless a newer transition already replaced it
    pub fn alert_elapsed(&mut self, epoch: u64) {
        if epoch == self.alert_epoch && self.display == DisplayState::Alert {
            self.display = self.state.into();
            self.emit_state();
        }
    }

    /// Freeze or resume the countdown of the current focus interval
    ///
    /// # Errors
    ///
    /// `NotInFocus` outside FOCUS
    pub fn set_task_pause(&mut self, paused: bool) -> Result<(), EngineError> {
        if self.state != SessionState::Focus {
            return Err(EngineError::NotInFocus);
        }
        if self.task_paused != paused {
            self.task_paused = paused;
            log::info!("Task {}", if paused { "paused" } else { "resumed" });
            if !paused {
                self.realign.notify_one();
            }
            self.emit_pause();
            self.sync_monitor();
        }
        Ok(())
    }

    /// Turn attention monitoring off or on; the countdown is unaffected
    pub fn set_supervision_pause(&mut self, paused: bool) {
        if self.supervision_paused != paused {
            self.supervision_paused = paused;
            log::info!("Supervision {}", if paused { "paused" } else { "resumed" });
            self.emit_pause();
            self.sync_monitor();
        }
    }

    /// Replace the queue mid-session, following the current task by identity
    ///
    /// # Errors
    ///
    /// `NotActive` when idle
    pub fn edit_queue(&mut self, drafts: Vec<TaskDraft>) -> Result<(), EngineError> {
        if self.state == SessionState::Idle {
            return Err(EngineError::NotActive);
        }
        let (Some(old_index), Some(old_task)) =
            (self.queue.current_index(), self.queue.current().cloned())
        else {
            return Err(EngineError::NotActive);
        };

        self.queue.replace(tasks_from_drafts(drafts));

        let Some(new_index) = self.queue.position_of(old_task.id) else {
            log::info!("Current task '{}' removed from the queue", old_task.step);
            if self.queue.is_empty() {
                log::info!("Queue emptied by edit");
            }
            if self.state == SessionState::Focus {
                self.close_record(SessionStatus::Deleted);
                self.monitor.stop();
            }
            // Continue as if it had just completed
            self.load_task(old_index, false);
            return Ok(());
        };

        let Some(new_task) = self.queue.select(new_index).cloned() else {
            return Ok(());
        };
        let (old_secs, new_secs) = match self.state {
            SessionState::Break => (old_task.break_secs(), new_task.break_secs()),
            _ => (old_task.focus_secs(), new_task.focus_secs()),
        };
        self.remaining_secs = adjust_countdown(self.remaining_secs, old_secs, new_secs);
        log::info!(
            "Queue edited: current task now at {}/{}, {}s remaining",
            new_index + 1,
            self.queue.len(),
            self.remaining_secs
        );

        if self.state == SessionState::Focus
            && new_task.step != old_task.step
            && self.monitor.is_running()
        {
            // New label, new profile
            self.monitor.stop();
            self.sync_monitor();
        }

        self.emit_state();
        self.emit(EngineEvent::Tick {
            remaining_secs: self.remaining_secs,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clock and monitor input
    // ------------------------------------------------------------------

    /// One countdown unit (one second) elapsed
    pub fn tick(&mut self) {
        let counting = match self.state {
            SessionState::Idle => false,
            SessionState::Focus => !self.task_paused,
            SessionState::Break => true,
        };
        if !counting {
            return;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.emit(EngineEvent::Tick {
            remaining_secs: self.remaining_secs,
        });

        if self.remaining_secs == 0 {
            if let Err(e) = self.complete_step() {
                log::debug!("Countdown expiry ignored: {e}");
            }
        }
    }

    /// Apply a monitor event unless it comes from a superseded run
    pub fn apply_report(&mut self, report: MonitorReport) {
        if self.state != SessionState::Focus || !self.monitor.is_current(report.generation) {
            log::debug!(
                "Discarding stale monitor event from generation {} (current {})",
                report.generation,
                self.monitor.generation()
            );
            return;
        }

        let MonitorEvent {
            process,
            title,
            distracted,
            reason,
            source,
        } = report.event;
        let now = Utc::now();

        let severity = if distracted {
            self.distraction_count += 1;
            if let Some(key) = self.session_id {
                self.records.distraction(key, &process, &title, &reason);
            }
            let severity = self.severity.record_at(now);
            log::info!("Distraction ({severity}): {process} - {title}: {reason}");
            severity
        } else {
            self.severity.severity_at(now)
        };

        let event = AttentionEvent {
            process,
            title,
            distracted,
            reason,
            source,
            severity,
        };
        self.last_attention = Some(event.clone());
        self.emit(EngineEvent::Attention(event));
    }

    /// Close any open record and stop monitoring
    pub fn shutdown(&mut self) {
        self.close_record(SessionStatus::Abandoned);
        self.monitor.stop();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolves once every record write queued so far has been applied
    pub fn flush_records(&self) -> oneshot::Receiver<()> {
        self.records.flush()
    }

    /// Signalled whenever the countdown phase should restart
    #[must_use]
    pub fn tick_realign(&self) -> Arc<Notify> {
        self.realign.clone()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&mut self) -> EngineStatus {
        let severity = self.severity.severity_at(Utc::now());
        EngineStatus {
            state: self.state,
            display: self.display,
            goal: self.goal.clone(),
            task_index: self.queue.current_index(),
            task_name: self.queue.current().map(|task| task.step.clone()),
            total: self.queue.len(),
            remaining_secs: self.remaining_secs,
            task_paused: self.task_paused,
            supervision_paused: self.supervision_paused,
            monitoring: self.monitor.is_running(),
            distraction_count: self.distraction_count,
            severity,
            last_attention: self.last_attention.clone(),
        }
    }

    #[must_use]
    pub fn queue(&self) -> (Vec<Task>, Option<usize>) {
        (self.queue.tasks().to_vec(), self.queue.current_index())
    }

    #[must_use]
    pub fn pending_plan(&self) -> Vec<Task> {
        self.pending_plan.clone()
    }

    #[cfg(test)]
    pub(crate) const fn monitor_generation(&self) -> u64 {
        self.monitor.generation()
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Enter FOCUS on `index`, or settle in IDLE when the queue has no such task
    fn load_task(&mut self, index: usize, queue_completed: bool) {
        let Some(task) = self.queue.select(index).cloned() else {
            self.finish_queue(queue_completed);
            return;
        };

        self.state = SessionState::Focus;
        self.display = DisplayState::Focus;
        self.remaining_secs = task.focus_secs();
        self.severity.reset();
        self.distraction_count = 0;
        self.last_attention = None;
        self.open_record(&task);
        self.realign.notify_one();
        log::info!(
            "Focus {}/{}: '{}' for {} min",
            index + 1,
            self.queue.len(),
            task.step,
            task.focus_minutes
        );

        self.emit_state();
        self.clear_task_pause();
        self.sync_monitor();
    }

    fn enter_break(&mut self) {
        let Some(task) = self.queue.current().cloned() else {
            self.finish_queue(false);
            return;
        };

        self.close_record(SessionStatus::Completed);
        self.monitor.stop();
        self.state = SessionState::Break;
        self.display = DisplayState::Break;
        self.remaining_secs = task.break_secs();
        self.realign.notify_one();
        log::info!("Break after '{}' for {} min", task.step, task.break_minutes);

        self.emit_state();
        self.clear_task_pause();
    }

    /// Callers close the record of the last task before getting here
    fn finish_queue(&mut self, completed: bool) {
        self.monitor.stop();
        self.reset_session();
        self.display = DisplayState::Idle;
        if completed {
            log::info!("Queue completed");
            self.emit(EngineEvent::QueueCompleted);
        }
        self.emit_state();
    }

    fn reset_session(&mut self) {
        self.queue.clear();
        self.state = SessionState::Idle;
        self.remaining_secs = 0;
        self.goal = None;
        self.distraction_count = 0;
        self.last_attention = None;
        self.severity.reset();
        self.clear_task_pause();
    }

    fn clear_task_pause(&mut self) {
        if self.task_paused {
            self.task_paused = false;
            self.emit_pause();
        }
    }

    /// Run the monitor exactly when in FOCUS with both pause flags clear
    fn sync_monitor(&mut self) {
        let should_run =
            self.state == SessionState::Focus && !self.task_paused && !self.supervision_paused;

        if should_run && !self.monitor.is_running() {
            if let Some(context) = self.monitor_context() {
                self.monitor.start(context);
            }
        } else if !should_run && self.monitor.is_running() {
            self.monitor.stop();
        }
    }

    fn monitor_context(&self) -> Option<MonitorContext> {
        let task = self.queue.current()?;
        Some(MonitorContext {
            goal: self.goal.clone().unwrap_or_default(),
            step: task.step.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Persistence (queued, never blocks a transition)
    // ------------------------------------------------------------------

    fn open_record(&mut self, task: &Task) {
        if let Some(key) = self.session_id {
            log::warn!("Session record {key} still open when starting '{}'", task.step);
            self.close_record(SessionStatus::Abandoned);
        }
        self.session_id = Some(self.records.start(&task.step, task.focus_minutes));
    }

    fn close_record(&mut self, status: SessionStatus) {
        if let Some(key) = self.session_id.take() {
            self.records.end(key, status);
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_state(&self) {
        self.emit(EngineEvent::StateChanged {
            display: self.display,
            task_index: self.queue.current_index(),
            task_name: self.queue.current().map(|task| task.step.clone()),
            total: self.queue.len(),
        });
    }

    fn emit_pause(&self) {
        self.emit(EngineEvent::PauseChanged {
            task_paused: self.task_paused,
            supervision_paused: self.supervision_paused,
        });
    }
}

/// Shift `remaining` by the change in declared length, never below zero
fn adjust_countdown(remaining: u64, old_secs: u64, new_secs: u64) -> u64 {
    if new_secs >= old_secs {
        remaining.saturating_add(new_secs - old_secs)
    } else {
        remaining.saturating_sub(old_secs - new_secs)
    }
}
