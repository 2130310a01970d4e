// ABOUTME: Bridge configuration loaded from TOML with sensible defaults

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Tunables for the terminal bridge.
///
/// The tmux session name is fixed per deployment so a reconnecting client
/// reattaches to the same shell instead of spawning a duplicate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the persistent tmux session inside the container.
    pub session_name: String,
    /// Delay between readiness probes during command injection.
    pub probe_interval_ms: u64,
    /// Total budget for the readiness probe before an injection is abandoned.
    pub probe_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            session_name: "webterm".to_string(),
            probe_interval_ms: 500,
            probe_timeout_secs: 30,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Argv for the interactive exec: attach to the named session,
    /// creating it on first connect.
    pub fn shell_argv(&self) -> Vec<String> {
        vec![
            "tmux".to_string(),
            "new-session".to_string(),
            "-As".to_string(),
            self.session_name.clone(),
        ]
    }
}
