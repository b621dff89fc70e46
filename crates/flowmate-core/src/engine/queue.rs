//! Ordered task queue with identity-based lookup.

use std::collections::HashSet;

use flowmate_ai::PlannedStep;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One queued step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub step: String,
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl Task {
    #[must_use]
    pub fn new(step: impl Into<String>, focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            step: step.into(),
            focus_minutes: focus_minutes.max(1),
            break_minutes: break_minutes.max(1),
        }
    }

    #[must_use]
    pub fn focus_secs(&self) -> u64 {
        u64::from(self.focus_minutes) * 60
    }

    #[must_use]
    pub fn break_secs(&self) -> u64 {
        u64::from(self.break_minutes) * 60
    }
}

impl From<&PlannedStep> for Task {
    fn from(step: &PlannedStep) -> Self {
        Self::new(step.step.clone(), step.duration, step.break_minutes)
    }
}

/// Externally supplied task, as in a plan confirmation or a queue edit
///
/// Drafts without an id are new tasks and get one assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub step: String,
    #[serde(alias = "duration")]
    pub focus_minutes: u32,
    #[serde(alias = "break")]
    pub break_minutes: u32,
}

impl TaskDraft {
    #[must_use]
    pub fn new(step: impl Into<String>, focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            id: None,
            step: step.into(),
            focus_minutes,
            break_minutes,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id),
            step: task.step.clone(),
            focus_minutes: task.focus_minutes,
            break_minutes: task.break_minutes,
        }
    }
}

/// Turn drafts into tasks: blank steps are dropped, minutes are at least one,
/// and a repeated id is treated as a new task.
#[must_use]
pub fn tasks_from_drafts(drafts: Vec<TaskDraft>) -> Vec<Task> {
    let mut seen = HashSet::new();
    drafts
        .into_iter()
        .filter(|draft| !draft.step.trim().is_empty())
        .map(|draft| {
            let mut task = Task::new(draft.step.trim(), draft.focus_minutes, draft.break_minutes);
            if let Some(id) = draft.id.filter(|id| seen.insert(*id)) {
                task.id = id;
            }
            seen.insert(task.id);
            task
        })
        .collect()
}

/// Tasks in execution order plus the index of the one executing
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    current: Option<usize>,
}

impl TaskQueue {
    /// Replace the contents; the current index is cleared
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.current = None;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Make `index` current; `None` (and no current task) when out of range
    pub fn select(&mut self, index: usize) -> Option<&Task> {
        if index < self.tasks.len() {
            self.current = Some(index);
            self.tasks.get(index)
        } else {
            self.current = None;
            None
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Task> {
        self.current.and_then(|i| self.tasks.get(i))
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drafts_keep_ids_and_assign_new_ones() {
        let kept = Uuid::new_v4();
        let tasks = tasks_from_drafts(vec![
            TaskDraft::new("Outline", 20, 5).with_id(kept),
            TaskDraft::new("Draft", 25, 5),
        ]);
        assert_eq!(tasks[0].id, kept);
        assert_ne!(tasks[1].id, kept);
    }

    #[test]
    fn test_drafts_are_normalised() {
        let dup = Uuid::new_v4();
        let tasks = tasks_from_drafts(vec![
            TaskDraft::new("  Read  ", 0, 0).with_id(dup),
            TaskDraft::new("   ", 25, 5),
            TaskDraft::new("Write", 30, 10).with_id(dup),
        ]);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].step, "Read");
        assert_eq!((tasks[0].focus_minutes, tasks[0].break_minutes), (1, 1));
        assert_eq!(tasks[0].id, dup);
        assert_ne!(tasks[1].id, dup);
    }

    #[test]
    fn test_draft_accepts_planner_keys() {
        let draft: TaskDraft =
            serde_json::from_str(r#"{"step": "Read", "duration": 15, "break": 3}"#).unwrap();
        assert_eq!(draft, TaskDraft::new("Read", 15, 3));
    }

    #[test]
    fn test_select_out_of_range_clears_current() {
        let mut queue = TaskQueue::default();
        queue.replace(vec![Task::new("a", 1, 1), Task::new("b", 1, 1)]);
        assert_eq!(queue.select(1).map(|t| t.step.as_str()), Some("b"));
        assert_eq!(queue.current_index(), Some(1));
        assert!(queue.select(2).is_none());
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_position_of_uses_identity() {
        let mut queue = TaskQueue::default();
        let a = Task::new("same", 1, 1);
        let b = Task::new("same", 1, 1);
        let b_id = b.id;
        queue.replace(vec![a, b]);
        assert_eq!(queue.position_of(b_id), Some(1));
        assert_eq!(queue.position_of(Uuid::new_v4()), None);
    }
}
