//! Helper utility functions for CLI commands

use anyhow::{bail, Context, Result};
use flowmate_core::{
    config::socket_path,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    TaskDraft,
};
use std::path::Path;

/// Safely truncate a string to a maximum number of characters (not bytes).
/// This avoids panics when slicing multi-byte UTF-8 characters.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Render a countdown as `MM:SS`, or `H:MM:SS` past an hour
pub fn format_countdown(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Read a JSON task list as written by `flowmate plan --out` or `queue show --json`
pub fn load_drafts(path: &Path) -> Result<Vec<TaskDraft>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_drafts(&raw).with_context(|| format!("Invalid task list in {}", path.display()))
}

pub fn parse_drafts(raw: &str) -> Result<Vec<TaskDraft>> {
    let drafts: Vec<TaskDraft> = serde_json::from_str(raw)?;
    Ok(drafts)
}

/// Send one request to the running daemon.
/// Engine rejections come back as `Err` with the daemon's message.
pub async fn send(request: IpcRequest) -> Result<IpcResponse> {
    let sock_path = socket_path()?;
    if !sock_path.exists() {
        bail!("Daemon is not running. Start it with `flowmate start`.");
    }

    let client = IpcClient::new(&sock_path);
    let response = client
        .send_command(request)
        .await
        .context("Daemon is not responding")?;
    match response {
        IpcResponse::Error(message) => bail!("{message}"),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        assert_eq!(truncate_str("hello world", 5), "hello...");
    }

    #[test]
    fn test_truncate_str_unicode() {
        assert_eq!(
            truncate_str("\u{4f60}\u{597d}\u{4e16}\u{754c}", 2),
            "\u{4f60}\u{597d}..."
        );
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(1500), "25:00");
        assert_eq!(format_countdown(3725), "1:02:05");
    }

    #[test]
    fn test_parse_drafts_accepts_plan_field_names() {
        let raw = r#"[
            {"step": "Outline", "duration": 20, "break": 5},
            {"id": "6f1c1c39-3f0b-4b39-9b55-52b1b1d6a1f0", "step": "Draft", "focus_minutes": 30, "break_minutes": 10}
        ]"#;
        let drafts = parse_drafts(raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].id, None);
        assert_eq!(drafts[0].focus_minutes, 20);
        assert_eq!(drafts[0].break_minutes, 5);
        assert!(drafts[1].id.is_some());
        assert_eq!(drafts[1].break_minutes, 10);
    }

    #[test]
    fn test_load_drafts_reports_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_drafts(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid task list"));

        assert!(load_drafts(&dir.path().join("missing.json")).is_err());
    }
}
