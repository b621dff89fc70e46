//! Events and snapshots the engine publishes to the presentation layer.

use serde::{Deserialize, Serialize};

use super::queue::Task;
use crate::attention::VerdictSource;
use crate::severity::Severity;

/// Lifecycle state of the session machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Focus,
    Break,
}

/// What the presentation layer should show; `Alert` is transient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    #[default]
    Idle,
    Focus,
    Break,
    Alert,
}

impl From<SessionState> for DisplayState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Idle => Self::Idle,
            SessionState::Focus => Self::Focus,
            SessionState::Break => Self::Break,
        }
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Focus => "FOCUS",
            Self::Break => "BREAK",
            Self::Alert => "ALERT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionEvent {
    pub process: String,
    pub title: String,
    pub distracted: bool,
    pub reason: String,
    pub source: VerdictSource,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanningOutcome {
    Ready(Vec<Task>),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    StateChanged {
        display: DisplayState,
        task_index: Option<usize>,
        task_name: Option<String>,
        total: usize,
    },
    Tick {
        remaining_secs: u64,
    },
    Attention(AttentionEvent),
    Planning(PlanningOutcome),
    PauseChanged {
        task_paused: bool,
        supervision_paused: bool,
    },
    /// The last break of the queue ended
    QueueCompleted,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: SessionState,
    pub display: DisplayState,
    pub goal: Option<String>,
    pub task_index: Option<usize>,
    pub task_name: Option<String>,
    pub total: usize,
    pub remaining_secs: u64,
    pub task_paused: bool,
    pub supervision_paused: bool,
    pub monitoring: bool,
    /// Distractions of the current focus record
    pub distraction_count: u32,
    pub severity: Severity,
    pub last_attention: Option<AttentionEvent>,
}
