// ABOUTME: Background task draining a session's output stream into client events

use crate::bridge::protocol::{OutputSink, ServerEvent};
use crate::docker::ControlError;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Drain the attached stream and republish each chunk as a
/// `terminal_output` event, in arrival order, until the stream ends,
/// errors, or the stop signal fires.
///
/// Chunks are decoded leniently; invalid byte sequences are replaced and
/// never abort the loop. Normal exit emits nothing to the client.
pub(crate) async fn pump_output<St, S>(
    mut stream: St,
    sink: S,
    mut stop_rx: oneshot::Receiver<()>,
    stopped: Arc<AtomicBool>,
) where
    St: Stream<Item = Result<Bytes, ControlError>> + Unpin,
    S: OutputSink,
{
    debug!("Session output reader started");

    while !stopped.load(Ordering::SeqCst) {
        tokio::select! {
            // Resolves on stop() or when the session handle is dropped.
            _ = &mut stop_rx => break,
            chunk = stream.next() => match chunk {
                Some(Ok(data)) => {
                    if data.is_empty() {
                        break;
                    }
                    trace!("Received {} bytes from session stream", data.len());
                    sink.emit(ServerEvent::output(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Err(e)) => {
                    warn!("Session stream read failed: {}", e);
                    break;
                }
                None => break,
            }
        }
    }

    debug!("Session output reader exiting");
}
