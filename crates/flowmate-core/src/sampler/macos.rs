use async_trait::async_trait;

use super::{command_output, ActivitySample, ActivitySampler, UNKNOWN};

const FRONT_WINDOW_SCRIPT: &str = r#"tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appName to name of frontApp
    set windowTitle to ""
    try
        set windowTitle to name of front window of frontApp
    end try
end tell
return appName & linefeed & windowTitle"#;

/// Sampler asking System Events through `osascript`
///
/// Needs the Accessibility permission for window titles; without it only the
/// process name is reported.
#[derive(Debug, Default)]
pub struct MacOsSampler;

#[async_trait]
impl ActivitySampler for MacOsSampler {
    async fn current(&self) -> ActivitySample {
        let Some(output) = command_output("osascript", &["-e", FRONT_WINDOW_SCRIPT]).await else {
            return ActivitySample::unknown();
        };

        let mut lines = output.lines();
        let process = lines.next().map(str::trim).filter(|s| !s.is_empty());
        let title = lines.next().map(str::trim).filter(|s| !s.is_empty());

        ActivitySample::new(title.unwrap_or(UNKNOWN), process.unwrap_or(UNKNOWN))
    }
}
