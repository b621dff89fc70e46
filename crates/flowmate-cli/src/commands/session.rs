//! Focus session commands
//!
//! Thin wrappers over the daemon's IPC endpoint. The daemon owns the engine;
//! these commands only send a request and print the answer.

use anyhow::{bail, Result};
use clap::Subcommand;
use flowmate_core::{ipc::IpcRequest, ipc::IpcResponse, Task, TaskDraft};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

use super::helpers::{load_drafts, send, truncate_str};

#[derive(Subcommand, Debug)]
pub enum QueueAction {
    /// Show the task queue of the running session
    Show {
        /// Print the queue as JSON, ready for `queue edit`
        #[arg(long)]
        json: bool,
    },
    /// Replace the queue with the tasks in a JSON file
    Edit {
        /// JSON array of {id?, step, focus_minutes, break_minutes}
        file: PathBuf,
    },
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Step")]
    step: String,
    #[tabled(rename = "Focus (min)")]
    focus: u32,
    #[tabled(rename = "Break (min)")]
    rest: u32,
}

fn task_table(tasks: &[Task], current: Option<usize>) -> String {
    let rows: Vec<TaskRow> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| TaskRow {
            marker: if Some(i) == current { ">" } else { "" },
            position: i + 1,
            step: truncate_str(&task.step, 50),
            focus: task.focus_minutes,
            rest: task.break_minutes,
        })
        .collect();
    Table::new(rows).to_string()
}

/// Ask the daemon to plan `goal`, then optionally confirm or save the plan
pub async fn plan(goal: &str, yes: bool, out: Option<&Path>) -> Result<()> {
    let response = send(IpcRequest::StartSession {
        goal: goal.to_string(),
    })
    .await?;
    let tasks = match response {
        IpcResponse::Plan { tasks } => tasks,
        other => bail!("Unexpected response from daemon: {other:?}"),
    };

    println!("\nPlan for: {goal}");
    println!("{}", task_table(&tasks, None));

    if let Some(path) = out {
        let drafts: Vec<TaskDraft> = tasks.iter().map(TaskDraft::from).collect();
        std::fs::write(path, serde_json::to_string_pretty(&drafts)?)?;
        println!("Plan written to {}", path.display());
    }

    if yes {
        send(IpcRequest::ConfirmPlan { tasks: None }).await?;
        if let Some(first) = tasks.first() {
            println!("Session started: focus on '{}'", first.step);
        }
    } else {
        println!("Run `flowmate confirm` to start, or edit the plan and `flowmate confirm --file <plan.json>`.");
    }
    Ok(())
}

/// Start the pending plan, or the tasks in `file`
pub async fn confirm(file: Option<&Path>) -> Result<()> {
    let tasks = file.map(load_drafts).transpose()?;
    send(IpcRequest::ConfirmPlan { tasks }).await?;
    println!("Session started.");
    Ok(())
}

pub async fn complete() -> Result<()> {
    send(IpcRequest::CompleteStep).await?;
    println!("Step completed.");
    Ok(())
}

pub async fn abandon() -> Result<()> {
    send(IpcRequest::Abandon).await?;
    println!("Session abandoned.");
    Ok(())
}

pub async fn set_task_pause(paused: bool) -> Result<()> {
    send(IpcRequest::SetTaskPause(paused)).await?;
    println!("{}", if paused { "Timer paused." } else { "Timer resumed." });
    Ok(())
}

pub async fn set_supervision(enabled: bool) -> Result<()> {
    send(IpcRequest::SetSupervisionPause(!enabled)).await?;
    println!(
        "Supervision {}.",
        if enabled { "enabled" } else { "paused" }
    );
    Ok(())
}

pub async fn handle_queue_command(action: QueueAction) -> Result<()> {
    match action {
        QueueAction::Show { json } => {
            let response = send(IpcRequest::Queue).await?;
            let (tasks, current) = match response {
                IpcResponse::Queue { tasks, current } => (tasks, current),
                other => bail!("Unexpected response from daemon: {other:?}"),
            };
            if json {
                let drafts: Vec<TaskDraft> = tasks.iter().map(TaskDraft::from).collect();
                println!("{}", serde_json::to_string_pretty(&drafts)?);
            } else if tasks.is_empty() {
                println!("Queue is empty.");
            } else {
                println!("{}", task_table(&tasks, current));
            }
        }
        QueueAction::Edit { file } => {
            let tasks = load_drafts(&file)?;
            let count = tasks.len();
            send(IpcRequest::EditQueue { tasks }).await?;
            println!("Queue updated ({count} tasks).");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_table_marks_current() {
        let tasks = vec![Task::new("Outline", 20, 5), Task::new("Draft", 30, 5)];
        let table = task_table(&tasks, Some(1));
        assert!(table.contains("Outline"));
        assert!(table.contains("Draft"));
        assert!(table.contains('>'));
        assert!(table.contains("Focus (min)"));
    }
}
