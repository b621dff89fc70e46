use async_trait::async_trait;

use super::{command_output, ActivitySample, ActivitySampler, UNKNOWN};

/// X11 sampler built on `xdotool` and `/proc`
#[derive(Debug, Default)]
pub struct LinuxSampler;

#[async_trait]
impl ActivitySampler for LinuxSampler {
    async fn current(&self) -> ActivitySample {
        let title = command_output("xdotool", &["getactivewindow", "getwindowname"]).await;
        let pid = command_output("xdotool", &["getactivewindow", "getwindowpid"]).await;

        let process = match pid.and_then(|p| p.parse::<u32>().ok()) {
            Some(pid) => process_name(pid).await,
            None => None,
        };

        ActivitySample::new(
            title.unwrap_or_else(|| UNKNOWN.to_string()),
            process.unwrap_or_else(|| UNKNOWN.to_string()),
        )
    }
}

async fn process_name(pid: u32) -> Option<String> {
    let comm = tokio::fs::read_to_string(format!("/proc/{pid}/comm"))
        .await
        .ok()?;
    let name = comm.trim();
    (!name.is_empty()).then(|| name.to_string())
}
