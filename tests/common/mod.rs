// ABOUTME: In-memory ControlApi fake recording exec traffic for integration tests

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use webterm_bridge::docker::{AttachedExec, ControlApi, ControlError, ExecOutcome};

/// Shared view on one started exec's stdin half.
#[derive(Clone, Default)]
pub struct WriterProbe {
    pub data: Arc<Mutex<Vec<u8>>>,
    pub closed: Arc<AtomicBool>,
    pub fail_writes: Arc<AtomicBool>,
}

pub struct FakeWriter {
    probe: WriterProbe,
}

impl AsyncWrite for FakeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.probe.fail_writes.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream is gone",
            )));
        }
        self.probe.data.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

struct Inner {
    container_id: String,
    resolve_ok: bool,
    chunks: Vec<Bytes>,
    ready_after: usize,
    fail_oneshot_after: Option<usize>,
    resolve_calls: AtomicUsize,
    probes: AtomicUsize,
    oneshot_calls: Mutex<Vec<Vec<String>>>,
    writers: Mutex<Vec<WriterProbe>>,
}

/// Cheaply cloneable so tests can hand one clone to the bridge and keep
/// another for assertions.
#[derive(Clone)]
pub struct FakeControl {
    inner: Arc<Inner>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                container_id: "cafe0123beef".to_string(),
                resolve_ok: true,
                chunks: Vec::new(),
                ready_after: 1,
                fail_oneshot_after: None,
                resolve_calls: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
                oneshot_calls: Mutex::new(Vec::new()),
                writers: Mutex::new(Vec::new()),
            }),
        }
    }

    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Arc::try_unwrap(self.inner)
            .ok()
            .expect("configure the fake before cloning it");
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// What the attached stream yields on every connect.
    pub fn with_chunks(self, chunks: Vec<&'static [u8]>) -> Self {
        self.map_inner(|inner| {
            inner.chunks = chunks.into_iter().map(Bytes::from_static).collect();
        })
    }

    /// Readiness probe succeeds on the nth attempt.
    pub fn ready_after(self, attempts: usize) -> Self {
        self.map_inner(|inner| inner.ready_after = attempts)
    }

    /// Readiness probe never succeeds.
    pub fn never_ready(self) -> Self {
        self.map_inner(|inner| inner.ready_after = usize::MAX)
    }

    /// Every `run_oneshot` call after the first n returns an error.
    pub fn fail_oneshot_after(self, n: usize) -> Self {
        self.map_inner(|inner| inner.fail_oneshot_after = Some(n))
    }

    /// Container resolution always fails.
    pub fn unresolvable(self) -> Self {
        self.map_inner(|inner| inner.resolve_ok = false)
    }

    pub fn resolve_calls(&self) -> usize {
        self.inner.resolve_calls.load(Ordering::SeqCst)
    }

    /// Every argv passed to `run_oneshot`, in call order.
    pub fn oneshot_calls(&self) -> Vec<Vec<String>> {
        self.inner.oneshot_calls.lock().unwrap().clone()
    }

    pub fn writer_count(&self) -> usize {
        self.inner.writers.lock().unwrap().len()
    }

    /// Probe for the stdin half of the nth started exec.
    pub fn writer(&self, index: usize) -> WriterProbe {
        self.inner.writers.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ControlApi for FakeControl {
    type ByteStream = stream::Iter<std::vec::IntoIter<Result<Bytes, ControlError>>>;
    type InputWriter = FakeWriter;

    async fn resolve_self_container_id(&self) -> Result<String, ControlError> {
        self.inner.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.resolve_ok {
            Ok(self.inner.container_id.clone())
        } else {
            Err(ControlError::ContainerNotFound(
                self.inner.container_id.clone(),
            ))
        }
    }

    async fn create_attached_exec(
        &self,
        _container: &str,
        _argv: &[String],
    ) -> Result<String, ControlError> {
        Ok(format!("exec-{}", self.writer_count()))
    }

    async fn start_attached_exec(
        &self,
        _exec_id: &str,
    ) -> Result<AttachedExec<Self::ByteStream, Self::InputWriter>, ControlError> {
        let items: Vec<Result<Bytes, ControlError>> =
            self.inner.chunks.iter().cloned().map(Ok).collect();
        let probe = WriterProbe::default();
        self.inner.writers.lock().unwrap().push(probe.clone());
        Ok(AttachedExec {
            output: stream::iter(items),
            input: FakeWriter { probe },
        })
    }

    async fn run_oneshot(
        &self,
        _container: &str,
        argv: &[String],
    ) -> Result<ExecOutcome, ControlError> {
        let call_count = {
            let mut calls = self.inner.oneshot_calls.lock().unwrap();
            calls.push(argv.to_vec());
            calls.len()
        };
        if let Some(limit) = self.inner.fail_oneshot_after {
            if call_count > limit {
                return Err(ControlError::NotAttached);
            }
        }

        let is_probe = argv.iter().any(|arg| arg.contains("has-session"));
        let exit_code = if is_probe {
            let attempt = self.inner.probes.fetch_add(1, Ordering::SeqCst) + 1;
            i64::from(attempt < self.inner.ready_after)
        } else {
            0
        };

        Ok(ExecOutcome {
            exit_code: Some(exit_code),
            output: String::new(),
        })
    }
}
