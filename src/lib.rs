// ABOUTME: Library crate bridging a containerized tmux shell to a web event channel

pub mod bridge;
pub mod config;
pub mod docker;

pub use bridge::{ConnectionId, OutputSink, ServerEvent, TerminalBridge, TerminalInput, TerminalPrepopulate};
pub use config::BridgeConfig;
pub use docker::{ControlApi, ControlClient, ControlError};
