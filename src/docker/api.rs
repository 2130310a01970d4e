// ABOUTME: Control-plane API surface for the container runtime
// Defines the exec operations the bridge needs and their error taxonomy

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;
use tokio::io::AsyncWrite;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Docker connection error: {0}")]
    Connection(#[from] bollard::errors::Error),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("hostname lookup failed: {0}")]
    Hostname(String),
    #[error("exec create failed: {0}")]
    ExecCreate(#[source] bollard::errors::Error),
    #[error("exec start failed: {0}")]
    ExecStart(#[source] bollard::errors::Error),
    #[error("exec did not attach")]
    NotAttached,
}

/// Both halves of an attached exec: the container's output as a chunk
/// stream and a writer feeding its stdin.
pub struct AttachedExec<O, I> {
    pub output: O,
    pub input: I,
}

/// Exit status and collected output of a one-shot exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: Option<i64>,
    pub output: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Wrapper over the container runtime's exec API.
///
/// No operation here retries; callers own their retry policy.
#[async_trait]
pub trait ControlApi: Send + Sync + 'static {
    type ByteStream: Stream<Item = Result<Bytes, ControlError>> + Send + Unpin + 'static;
    type InputWriter: AsyncWrite + Send + Unpin + 'static;

    /// Derive the id of the container this process runs in and confirm
    /// the control API knows it.
    async fn resolve_self_container_id(&self) -> Result<String, ControlError>;

    /// Create an interactive (tty) exec job in the container.
    async fn create_attached_exec(
        &self,
        container: &str,
        argv: &[String],
    ) -> Result<String, ControlError>;

    /// Start a previously created exec job as an attached byte stream.
    async fn start_attached_exec(
        &self,
        exec_id: &str,
    ) -> Result<AttachedExec<Self::ByteStream, Self::InputWriter>, ControlError>;

    /// Run a command to completion and return its exit status and output.
    async fn run_oneshot(
        &self,
        container: &str,
        argv: &[String],
    ) -> Result<ExecOutcome, ControlError>;
}
