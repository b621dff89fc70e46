/// Daemon lifecycle management commands
use anyhow::Result;
use flowmate_core::{
    config::{get_data_dir, EngineConfig},
    ipc::{IpcClient, IpcRequest, IpcResponse},
    Daemon, EngineStatus, SessionState,
};
use flowmate_storage::Database;
use std::{env, fs, io, path::Path, process::Command, sync::Arc, thread::sleep, time};
use sysinfo::{Pid, System};

use super::helpers::{format_countdown, truncate_str};

pub fn start_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join("flowmate.pid");
    let sock_path = data_dir.join("flowmate.sock");

    if pid_file_path.exists() {
        if let Ok(pid_str) = fs::read_to_string(&pid_file_path) {
            if let Ok(pid) = pid_str.trim().parse::<usize>() {
                let mut sys = System::new();
                if sys.refresh_process(Pid::from(pid)) {
                    log::info!("Daemon is already running (PID: {pid}).");
                    return Ok(());
                }
            }
        }
        log::warn!("Removing stale PID file.");
        let _ = fs::remove_file(&pid_file_path);
    }

    if sock_path.exists() {
        log::warn!("Removing stale socket file.");
        fs::remove_file(&sock_path)?;
    }

    log::info!("Starting FlowMate daemon...");

    let current_exe = env::current_exe()?;
    let current_dir = env::current_dir()?;
    let child = Command::new(current_exe)
        .arg("daemon-internal-start")
        .current_dir(current_dir)
        .spawn()?;

    log::info!("Daemon process started with PID: {}", child.id());
    fs::write(&pid_file_path, child.id().to_string())?;

    Ok(())
}

pub async fn run_daemon_process() -> Result<()> {
    // Detached process: stderr goes nowhere, so log to a file
    setup_daemon_logging()?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic().await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic() -> Result<()> {
    let config = EngineConfig::load()?;
    let db = Arc::new(Database::new(None)?);
    let daemon = Daemon::new(db, &config)?;
    daemon.run_with_signals().await
}

pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_file_path = data_dir.join("flowmate.pid");
    let sock_path = data_dir.join("flowmate.sock");

    if !pid_file_path.exists() {
        log::info!("Daemon is not running (no PID file).");
        if sock_path.exists() {
            fs::remove_file(&sock_path)?;
        }
        return Ok(());
    }

    let pid_str = fs::read_to_string(&pid_file_path)?;
    let pid = pid_str
        .trim()
        .parse::<usize>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    log::info!("Stopping FlowMate daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);

    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            log::info!("Daemon shutdown signal sent. Waiting for process to exit...");
            sleep(time::Duration::from_secs(2));

            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                log::warn!("Daemon did not stop gracefully. Force killing...");
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                }
            } else {
                log::info!("Daemon stopped successfully.");
            }
        }
        Ok(resp) => log::error!("Received unexpected response from daemon: {resp:?}"),
        Err(e) => {
            log::error!("Failed to send shutdown command: {e}. Forcing cleanup.");
            let mut sys = System::new();
            if sys.refresh_process(Pid::from(pid)) {
                if let Some(process) = sys.process(Pid::from(pid)) {
                    process.kill();
                    log::info!("Process killed.");
                }
            }
        }
    }

    fs::remove_file(&pid_file_path)?;
    if sock_path.exists() {
        fs::remove_file(&sock_path)?;
    }

    Ok(())
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let sock_path = data_dir.join("flowmate.sock");

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status(status)) => {
            println!("Daemon Status: Running");
            print!("{}", render_status(&status));
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn render_status(status: &EngineStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nState: {}\n", status.display));

    if status.state == SessionState::Idle {
        out.push_str("No focus session. Plan one with `flowmate plan <goal>`.\n");
    } else {
        if let Some(goal) = &status.goal {
            out.push_str(&format!("Goal: {}\n", truncate_str(goal, 60)));
        }
        let position = status.task_index.map_or(0, |i| i + 1);
        out.push_str(&format!(
            "Task {position}/{}: {}\n",
            status.total,
            status.task_name.as_deref().unwrap_or("-")
        ));
        let paused = if status.task_paused { " (paused)" } else { "" };
        out.push_str(&format!(
            "Remaining: {}{paused}\n",
            format_countdown(status.remaining_secs)
        ));
    }

    let supervision = if status.supervision_paused {
        "paused"
    } else if status.monitoring {
        "watching"
    } else {
        "idle"
    };
    out.push_str(&format!("Supervision: {supervision}\n"));

    if status.state == SessionState::Focus {
        out.push_str(&format!(
            "Distractions: {} ({})\n",
            status.distraction_count, status.severity
        ));
    }
    if let Some(attention) = &status.last_attention {
        let verdict = if attention.distracted {
            "DISTRACTED"
        } else {
            "on task"
        };
        out.push_str(&format!(
            "Last check: {verdict} [{}] {} - {}: {}\n",
            attention.source,
            attention.process,
            truncate_str(&attention.title, 40),
            attention.reason
        ));
    }
    out
}

fn setup_daemon_logging() -> Result<()> {
    use std::fs::{create_dir_all, OpenOptions};

    let log_path = get_data_dir()?.join("flowmate.log");

    if let Some(parent) = log_path.parent() {
        create_dir_all(parent)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();

    Ok(())
}
