//! I/O primitives for talking to the stay-open child.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::protocol::{LineEvent, StreamKind};
use crate::{Error, Result};

/// Routes output lines to whichever call is currently subscribed.
///
/// Shared between the process and its two pump tasks. Lines that arrive
/// while nobody is subscribed are dropped, so late output from one call can
/// never land in another call's result.
#[derive(Debug, Clone, Default)]
pub struct LineRouter {
    sink: Arc<Mutex<Option<UnboundedSender<LineEvent>>>>,
    stdout_closed: Arc<AtomicBool>,
    stderr_closed: Arc<AtomicBool>,
}

impl LineRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<UnboundedSender<LineEvent>>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn closed_flag(&self, stream: StreamKind) -> &AtomicBool {
        match stream {
            StreamKind::Stdout => &self.stdout_closed,
            StreamKind::Stderr => &self.stderr_closed,
        }
    }

    /// Install a fresh sink for one call.
    ///
    /// Replaces any previous sink. If stdout is already closed the receiver
    /// yields [`LineEvent::Closed`] right away instead of waiting forever.
    pub fn subscribe(&self) -> (Subscription, UnboundedReceiver<LineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.slot() = Some(tx.clone());

        // Checked after installing the sink: a pump that closes later will
        // find the sink and send Closed itself.
        if self.is_closed(StreamKind::Stdout) {
            let _ = tx.send(LineEvent::Closed(StreamKind::Stdout));
        }

        (
            Subscription {
                router: self.clone(),
            },
            rx,
        )
    }

    /// Whether the given stream has reached EOF.
    pub fn is_closed(&self, stream: StreamKind) -> bool {
        self.closed_flag(stream).load(Ordering::SeqCst)
    }

    pub(crate) fn deliver(&self, stream: StreamKind, text: String) {
        let slot = self.slot();
        match slot.as_ref() {
            Some(tx) => {
                tracing::trace!(%stream, line = %text, "received line");
                // A send error means the call already finished
                let _ = tx.send(LineEvent::Line { stream, text });
            }
            None => tracing::trace!(%stream, line = %text, "discarding unattributed line"),
        }
    }

    pub(crate) fn close(&self, stream: StreamKind) {
        self.closed_flag(stream).store(true, Ordering::SeqCst);
        if let Some(tx) = self.slot().as_ref() {
            let _ = tx.send(LineEvent::Closed(stream));
        }
    }

    fn unsubscribe(&self) {
        self.slot().take();
    }
}

/// Registration of one call's line sink.
///
/// Dropping it unregisters the sink on every exit path of the call.
#[derive(Debug)]
pub struct Subscription {
    router: LineRouter,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.router.unsubscribe();
    }
}

/// Read `reader` line by line and hand each line to the router.
///
/// Runs until EOF or a read error, then marks the stream closed.
pub(crate) async fn pump_lines<R>(reader: R, stream: StreamKind, router: LineRouter)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::with_capacity(4096);

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => router.deliver(stream, decode_line(&buffer)),
            Err(e) => {
                tracing::warn!(%stream, error = %e, "read from child failed");
                break;
            }
        }
    }

    tracing::debug!(%stream, "child stream closed");
    router.close(stream);
}

/// Decode one raw line, dropping its `\n` or `\r\n` terminator.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Writes protocol lines to the child stdin.
#[derive(Debug)]
pub struct CommandWriter {
    stdin: Option<ChildStdin>,
}

impl CommandWriter {
    /// Create a new writer from a child process stdin.
    pub fn new(stdin: ChildStdin) -> Self {
        Self { stdin: Some(stdin) }
    }

    /// Write `text` followed by `\n` and flush.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            Error::broken_pipe(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdin already closed",
            ))
        })?;

        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(b'\n');

        tracing::trace!(line = %text, "sending line");
        stdin.write_all(&line).await.map_err(Error::broken_pipe)?;
        stdin.flush().await.map_err(Error::broken_pipe)?;
        Ok(())
    }

    /// Close stdin so the child sees EOF.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await.map_err(Error::broken_pipe)?;
        }
        Ok(())
    }
}
