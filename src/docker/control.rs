// ABOUTME: ControlApi implementation over Bollard against the local Docker daemon

use super::api::{AttachedExec, ControlApi, ControlError, ExecOutcome};
use async_trait::async_trait;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use std::pin::Pin;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

pub struct ControlClient {
    docker: Docker,
}

impl ControlClient {
    /// Connect to the Docker daemon and verify it answers.
    pub async fn new() -> Result<Self, ControlError> {
        let docker = Docker::connect_with_local_defaults().map_err(ControlError::Connection)?;

        // Test the connection
        docker.ping().await.map_err(ControlError::Connection)?;

        info!("Successfully connected to Docker daemon");
        Ok(Self { docker })
    }
}

#[async_trait]
impl ControlApi for ControlClient {
    type ByteStream = BoxStream<'static, Result<Bytes, ControlError>>;
    type InputWriter = Pin<Box<dyn AsyncWrite + Send>>;

    async fn resolve_self_container_id(&self) -> Result<String, ControlError> {
        let hostname = nix::unistd::gethostname()
            .map_err(|e| ControlError::Hostname(e.to_string()))?
            .to_string_lossy()
            .into_owned();

        // Inside a container the hostname is the short container id;
        // inspect confirms the daemon actually knows it.
        if let Err(e) = self.docker.inspect_container(&hostname, None).await {
            warn!("Container {} not known to daemon: {}", hostname, e);
            return Err(ControlError::ContainerNotFound(hostname));
        }

        debug!("Resolved own container id: {}", hostname);
        Ok(hostname)
    }

    async fn create_attached_exec(
        &self,
        container: &str,
        argv: &[String],
    ) -> Result<String, ControlError> {
        let options = CreateExecOptions {
            cmd: Some(argv.to_vec()),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(true),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(ControlError::ExecCreate)?;

        debug!(
            "Created attached exec {} in container {}",
            created.id, container
        );
        Ok(created.id)
    }

    async fn start_attached_exec(
        &self,
        exec_id: &str,
    ) -> Result<AttachedExec<Self::ByteStream, Self::InputWriter>, ControlError> {
        let started = self
            .docker
            .start_exec(exec_id, None)
            .await
            .map_err(ControlError::ExecStart)?;

        match started {
            StartExecResults::Attached { output, input } => {
                let output = output
                    .map_ok(bollard::container::LogOutput::into_bytes)
                    .map_err(ControlError::Connection)
                    .boxed();
                Ok(AttachedExec { output, input })
            }
            StartExecResults::Detached => Err(ControlError::NotAttached),
        }
    }

    async fn run_oneshot(
        &self,
        container: &str,
        argv: &[String],
    ) -> Result<ExecOutcome, ControlError> {
        let options = CreateExecOptions {
            cmd: Some(argv.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(container, options)
            .await
            .map_err(ControlError::ExecCreate)?;

        let mut collected = String::new();
        match self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(ControlError::ExecStart)?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    match chunk {
                        Ok(log) => {
                            collected.push_str(&String::from_utf8_lossy(&log.into_bytes()));
                        }
                        Err(e) => {
                            warn!("Error draining exec output: {}", e);
                            break;
                        }
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self.docker.inspect_exec(&created.id).await?;
        Ok(ExecOutcome {
            exit_code: inspect.exit_code,
            output: collected,
        })
    }
}
