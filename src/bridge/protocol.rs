// ABOUTME: Event channel payload definitions for the terminal bridge
// Rust counterpart to the browser-side socket event contract

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Connection id assigned by the event channel transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// ============================================
// Client → Bridge Messages
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalInput {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalPrepopulate {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cd: Option<String>,
}

// ============================================
// Bridge → Client Messages
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    TerminalOutput { output: String },
}

impl ServerEvent {
    pub fn output(text: impl Into<String>) -> Self {
        ServerEvent::TerminalOutput {
            output: text.into(),
        }
    }
}

/// Capability to emit events back to the connected client.
///
/// The web-serving layer provides the real transport; an unbounded mpsc
/// sender is the in-process implementation used for embedding and tests.
pub trait OutputSink: Send + Sync + 'static {
    fn emit(&self, event: ServerEvent);
}

impl OutputSink for mpsc::UnboundedSender<ServerEvent> {
    fn emit(&self, event: ServerEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Output channel closed, event dropped");
        }
    }
}
