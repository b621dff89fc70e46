//! Foreground activity sampling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

/// Literal used for any field the platform could not report
pub const UNKNOWN: &str = "Unknown";

/// Foreground window as seen by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub title: String,
    pub process: String,
}

impl ActivitySample {
    #[must_use]
    pub fn new(title: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            process: process.into(),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }

    /// Title and process joined and lowercased, the text every matcher runs on
    #[must_use]
    pub fn combined_lowercase(&self) -> String {
        format!("{} {}", self.title, self.process).to_lowercase()
    }
}

/// Platform collaborator producing the current foreground activity
///
/// Best effort: failures are reported as [`ActivitySample::unknown`].
#[async_trait]
pub trait ActivitySampler: Send + Sync {
    async fn current(&self) -> ActivitySample;
}

/// Sampler for platforms without foreground inspection
#[derive(Debug, Default)]
pub struct UnknownSampler;

#[async_trait]
impl ActivitySampler for UnknownSampler {
    async fn current(&self) -> ActivitySample {
        ActivitySample::unknown()
    }
}

/// Create platform-specific sampler
#[must_use]
pub fn create_sampler() -> Box<dyn ActivitySampler> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOsSampler)
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxSampler)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        log::warn!("Foreground sampling is not supported on this platform");
        Box::new(UnknownSampler)
    }
}

/// Run a helper program and return its trimmed stdout, `None` on any failure
#[cfg(any(target_os = "macos", target_os = "linux"))]
async fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = match tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::debug!("Failed to run {program}: {e}");
            return None;
        }
    };
    if !output.status.success() {
        log::debug!("{program} exited with {}", output.status);
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_is_lowercase() {
        let sample = ActivitySample::new("Notepad - Draft.txt", "notepad.exe");
        assert_eq!(sample.combined_lowercase(), "notepad - draft.txt notepad.exe");
    }

    #[tokio::test]
    async fn test_unknown_sampler() {
        let sample = UnknownSampler.current().await;
        assert_eq!(sample, ActivitySample::new("Unknown", "Unknown"));
    }
}
