// ABOUTME: Out-of-band command injection into the running tmux session
// Validates the request, polls session readiness, then types the command

use crate::config::BridgeConfig;
use crate::docker::ControlApi;
use std::time::Duration;
use tracing::{debug, warn};

/// Handle a prepopulate request. Every failure path is logged and
/// swallowed; the client is never sent a structured error for these.
pub(crate) async fn prepopulate<C: ControlApi>(
    control: &C,
    config: &BridgeConfig,
    command: &str,
    cd: Option<&str>,
) {
    let command = command.trim();
    if command.is_empty() {
        debug!("No command to prepopulate, ignoring");
        return;
    }
    if command.contains(['\n', '\r']) {
        warn!("Line breaks in prepopulate command are forbidden, ignoring");
        return;
    }
    let cd = cd.map(str::trim).filter(|path| !path.is_empty());

    let container = match control.resolve_self_container_id().await {
        Ok(id) => id,
        Err(e) => {
            warn!("Could not resolve own container, aborting prepopulate: {}", e);
            return;
        }
    };

    if !wait_until_ready(
        control,
        &container,
        &config.session_name,
        config.probe_interval(),
        config.probe_timeout(),
    )
    .await
    {
        warn!(
            "tmux session {} never became ready, aborting prepopulate",
            config.session_name
        );
        return;
    }

    if let Some(path) = cd {
        let keys = format!(
            "tmux send-keys -t {} C-a C-k {} Enter",
            config.session_name,
            shell_quote(&format!("cd {path}"))
        );
        if !send_keys(control, &container, &keys).await {
            warn!("Failed sending cd command, aborting prepopulate");
            return;
        }
    }

    // The command is typed without a trailing Enter; submitting it stays
    // the user's decision.
    let keys = format!(
        "tmux send-keys -t {} C-a C-k {}",
        config.session_name,
        shell_quote(command)
    );
    if !send_keys(control, &container, &keys).await {
        warn!("Failed sending prepopulate command");
    }
}

/// Poll `tmux has-session` until it reports the named session or the
/// budget runs out.
async fn wait_until_ready<C: ControlApi>(
    control: &C,
    container: &str,
    session: &str,
    interval: Duration,
    timeout: Duration,
) -> bool {
    let argv = sh(&format!("tmux has-session -t {session}"));
    let mut elapsed = Duration::ZERO;

    while elapsed < timeout {
        match control.run_oneshot(container, &argv).await {
            Ok(outcome) if outcome.success() => {
                debug!("tmux session {} is ready", session);
                return true;
            }
            Ok(_) => debug!("tmux session {} not ready yet, retrying", session),
            Err(e) => warn!("Readiness probe failed: {}", e),
        }
        tokio::time::sleep(interval).await;
        elapsed += interval;
    }

    false
}

async fn send_keys<C: ControlApi>(control: &C, container: &str, keys: &str) -> bool {
    match control.run_oneshot(container, &sh(keys)).await {
        Ok(_) => {
            debug!("Sent keystrokes: {}", keys);
            true
        }
        Err(e) => {
            warn!("Keystroke send failed ({}): {}", keys, e);
            false
        }
    }
}

fn sh(command: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), command.to_string()]
}

pub(crate) fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
