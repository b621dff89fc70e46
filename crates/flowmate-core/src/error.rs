use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands the focus engine refuses in its current state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("a focus session is already running")]
    SessionActive,

    #[error("no focus session is running")]
    NotActive,

    #[error("only possible during a focus interval")]
    NotInFocus,

    #[error("the plan contains no tasks")]
    EmptyPlan,

    #[error("the planner could not produce any steps")]
    PlanningFailed,
}
