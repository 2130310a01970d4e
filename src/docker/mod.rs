// ABOUTME: Docker integration for exec jobs against the bridge's own container

pub mod api;
pub mod control;

pub use api::{AttachedExec, ControlApi, ControlError, ExecOutcome};
pub use control::ControlClient;
