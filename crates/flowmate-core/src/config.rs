use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the local data directory for flowmate.
///
/// `FLOWMATE_DATA_DIR` takes precedence over the platform default.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FLOWMATE_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("flowmate");
    Ok(path)
}

/// Path of the daemon's IPC socket
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn socket_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("flowmate.sock"))
}

/// Tunables of the focus engine, read from the `[engine]` table of `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Countdown tick period; every tick removes one second
    pub tick_interval_ms: u64,
    pub sample_interval_ms: u64,
    /// Unchanged titles are not re-judged within this window
    pub debounce_secs: u64,
    pub judge_timeout_secs: u64,
    pub profile_timeout_secs: u64,
    pub plan_timeout_secs: u64,
    pub severity_window_secs: u64,
    /// More distractions than this inside the window is critical
    pub severity_threshold: usize,
    pub alert_revert_ms: u64,
    /// Process or title fragments identifying this tool itself
    pub self_identities: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            sample_interval_ms: 1000,
            debounce_secs: 5,
            judge_timeout_secs: 10,
            profile_timeout_secs: 20,
            plan_timeout_secs: 30,
            severity_window_secs: 60,
            severity_threshold: 3,
            alert_revert_ms: 1500,
            self_identities: vec!["flowmate".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
}

impl EngineConfig {
    /// Load `<data_dir>/config.toml`, or defaults when it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_from(&get_data_dir()?.join("config.toml"))
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(raw)?;
        Ok(file.engine)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    #[must_use]
    pub const fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge_timeout_secs)
    }

    #[must_use]
    pub const fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }

    #[must_use]
    pub const fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }

    #[must_use]
    pub const fn severity_window(&self) -> Duration {
        Duration::from_secs(self.severity_window_secs)
    }

    #[must_use]
    pub const fn alert_revert(&self) -> Duration {
        Duration::from_millis(self.alert_revert_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.debounce(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_engine_table_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            "[engine]\ndebounce_secs = 8\nself_identities = [\"flowmate\", \"focus-hud\"]\n",
        )
        .unwrap();
        assert_eq!(config.debounce_secs, 8);
        assert_eq!(config.self_identities.len(), 2);
        assert_eq!(config.severity_threshold, 3);
        assert_eq!(config.severity_window(), Duration::from_secs(60));
    }

    #[test]
    fn test_unrelated_tables_are_ignored() {
        let config = EngineConfig::from_toml_str("[ui]\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\ndebounce_secs = \"soon\"\n").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }
}
