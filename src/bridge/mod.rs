// ABOUTME: Terminal bridge supervisor: session lifecycle and event handlers
// Connects client connect/input/prepopulate/disconnect events to exec sessions

pub mod injector;
pub mod protocol;
pub mod reader;
pub mod session;

pub use protocol::{ConnectionId, OutputSink, ServerEvent, TerminalInput, TerminalPrepopulate};
pub use session::Session;

use crate::config::BridgeConfig;
use crate::docker::{ControlApi, ControlError};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

/// Supervises at most one attached shell session per client connection.
///
/// Sessions live in a lock-protected map keyed by connection id, so
/// overlapping connects for different clients cannot clobber each other's
/// streams.
pub struct TerminalBridge<C: ControlApi> {
    control: Arc<C>,
    config: BridgeConfig,
    sessions: Mutex<HashMap<ConnectionId, Session<C::InputWriter>>>,
}

impl<C: ControlApi> TerminalBridge<C> {
    pub fn new(control: C, config: BridgeConfig) -> Self {
        Self {
            control: Arc::new(control),
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a session is currently bridged for this connection.
    pub async fn is_active(&self, conn: &ConnectionId) -> bool {
        self.sessions.lock().await.contains_key(conn)
    }

    /// Client connected: attach an exec running the persistent tmux
    /// session and start streaming its output. Failures are reported to
    /// the client as plain output events and leave no session behind.
    pub async fn handle_connect<S>(&self, conn: &ConnectionId, sink: &S)
    where
        S: OutputSink + Clone,
    {
        info!("Client connected: {}", conn);

        // A reconnect under the same id replaces the previous session.
        self.teardown(conn).await;

        let container_id = match self.control.resolve_self_container_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not resolve own container: {}", e);
                sink.emit(ServerEvent::output("ERROR: Could not get container.\n"));
                return;
            }
        };

        let argv = self.config.shell_argv();
        let started = async {
            let exec_id = self.control.create_attached_exec(&container_id, &argv).await?;
            let io = self.control.start_attached_exec(&exec_id).await?;
            Ok::<_, ControlError>((exec_id, io))
        }
        .await;

        let (exec_id, io) = match started {
            Ok(pair) => pair,
            Err(e) => {
                error!("Failed to start shell exec: {}", e);
                sink.emit(ServerEvent::output(format!("ERROR: {e}\n")));
                return;
            }
        };

        // The notice must reach the client before any stream data can.
        sink.emit(ServerEvent::output("*** Shell session started ***\n"));

        let stopped = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = oneshot::channel();
        let reader = tokio::spawn(reader::pump_output(
            io.output,
            sink.clone(),
            stop_rx,
            Arc::clone(&stopped),
        ));

        let session = Session::new(container_id, exec_id, io.input, stop_tx, stopped, reader);
        self.sessions.lock().await.insert(conn.clone(), session);
    }

    /// Forward client keystrokes verbatim into the session's stdin.
    /// Nothing is buffered when no session is active.
    pub async fn handle_input<S: OutputSink>(
        &self,
        conn: &ConnectionId,
        event: TerminalInput,
        sink: &S,
    ) {
        let input = {
            let sessions = self.sessions.lock().await;
            sessions.get(conn).map(Session::input)
        };

        let Some(input) = input else {
            sink.emit(ServerEvent::output("ERROR: No shell session active.\n"));
            return;
        };

        let mut writer = input.lock().await;
        let written = async {
            writer.write_all(event.input.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!("Failed to write to shell stream: {}", e);
            sink.emit(ServerEvent::output(format!("ERROR writing to shell: {e}\n")));
        }
    }

    /// Inject a pre-typed command into the running tmux session. All
    /// failures are logged only; see the injector for the probe policy.
    pub async fn handle_prepopulate(&self, request: TerminalPrepopulate) {
        debug!("Received prepopulate request");
        injector::prepopulate(
            self.control.as_ref(),
            &self.config,
            &request.command,
            request.cd.as_deref(),
        )
        .await;
    }

    /// Client disconnected: stop and drop the session. The stop flag is
    /// set and the stream close issued before this returns; the reader
    /// exits cooperatively afterwards.
    pub async fn handle_disconnect(&self, conn: &ConnectionId) {
        info!("Client disconnected: {}", conn);
        self.teardown(conn).await;
    }

    async fn teardown(&self, conn: &ConnectionId) {
        let session = self.sessions.lock().await.remove(conn);
        if let Some(mut session) = session {
            session.stop();
            let input = session.input();
            if let Err(e) = input.lock().await.shutdown().await {
                debug!("Error closing shell stream: {}", e);
            }
            debug!("Session for {} torn down", conn);
        }
    }
}
