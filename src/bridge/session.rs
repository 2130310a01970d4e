// ABOUTME: Handle for one live attached shell session
// Owns the stdin half, the stop flag, and the reader task handle

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

/// One bridged shell session. The output half lives inside the reader
/// task; this handle keeps everything needed to feed and tear it down.
pub struct Session<W> {
    pub container_id: String,
    pub exec_id: String,
    input: Arc<Mutex<W>>,
    stop_tx: Option<oneshot::Sender<()>>,
    stopped: Arc<AtomicBool>,
    _reader: JoinHandle<()>,
}

impl<W: AsyncWrite + Send + Unpin + 'static> Session<W> {
    pub(crate) fn new(
        container_id: String,
        exec_id: String,
        input: W,
        stop_tx: oneshot::Sender<()>,
        stopped: Arc<AtomicBool>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            container_id,
            exec_id,
            input: Arc::new(Mutex::new(input)),
            stop_tx: Some(stop_tx),
            stopped,
            _reader: reader,
        }
    }

    /// Shared handle to the stdin half of the attached stream.
    pub(crate) fn input(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.input)
    }

    /// Flag the session as stopped and wake the reader. The reader is not
    /// joined; it observes the signal and exits on its own.
    pub(crate) fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
