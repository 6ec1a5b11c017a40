//! Per-call accumulation of child output.

use tokio::sync::mpsc::UnboundedReceiver;

use super::events::{LineEvent, StreamKind};
use super::marker::split_at_marker;
use super::result::ExecuteResult;
use crate::{Error, Result};

/// Whether a call has seen its ready marker yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Pending,
    Complete,
}

/// Output accumulated for the call currently in flight.
///
/// Lives exactly as long as one `execute` and is consumed by [`wait`](Self::wait),
/// so completion can only fire once.
#[derive(Debug)]
pub(crate) struct PendingCall<'a> {
    sentinel: &'a str,
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl<'a> PendingCall<'a> {
    pub(crate) fn new(sentinel: &'a str) -> Self {
        Self {
            sentinel,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Apply one event to the accumulators.
    pub(crate) fn accept(&mut self, event: LineEvent) -> Result<Progress> {
        match event {
            LineEvent::Line {
                stream: StreamKind::Stdout,
                text,
            } => match split_at_marker(&text, self.sentinel) {
                Some(prefix) => {
                    if !prefix.is_empty() {
                        self.stdout.push(prefix.to_string());
                    }
                    Ok(Progress::Complete)
                }
                None => {
                    self.stdout.push(text);
                    Ok(Progress::Pending)
                }
            },
            LineEvent::Line {
                stream: StreamKind::Stderr,
                text,
            } => {
                self.stderr.push(text);
                Ok(Progress::Pending)
            }
            LineEvent::Closed(StreamKind::Stdout) => Err(Error::broken_pipe(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "child closed stdout before the ready marker",
            ))),
            // stdout may still complete the call
            LineEvent::Closed(StreamKind::Stderr) => Ok(Progress::Pending),
        }
    }

    /// Consume events until the ready marker arrives.
    ///
    /// Stderr lines already queued when the marker is seen are kept; the
    /// two streams are independent pipes, so a diagnostic written just
    /// before the marker may be read just after it.
    pub(crate) async fn wait(
        mut self,
        events: &mut UnboundedReceiver<LineEvent>,
    ) -> Result<ExecuteResult> {
        loop {
            let Some(event) = events.recv().await else {
                return Err(Error::broken_pipe(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "line router dropped the subscription",
                )));
            };
            if self.accept(event)? == Progress::Complete {
                break;
            }
        }

        while let Ok(event) = events.try_recv() {
            match event {
                LineEvent::Line {
                    stream: StreamKind::Stderr,
                    text,
                } => self.stderr.push(text),
                other => tracing::trace!(?other, "discarding event after ready marker"),
            }
        }

        Ok(ExecuteResult::new(self.stdout, self.stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const READY: &str = "{ready}";

    #[test]
    fn plain_lines_accumulate_verbatim() {
        let mut call = PendingCall::new(READY);
        assert_eq!(call.accept(LineEvent::stdout("a")).unwrap(), Progress::Pending);
        assert_eq!(call.accept(LineEvent::stdout("")).unwrap(), Progress::Pending);
        assert_eq!(call.accept(LineEvent::stderr("oops")).unwrap(), Progress::Pending);
        assert_eq!(call.stdout, ["a", ""]);
        assert_eq!(call.stderr, ["oops"]);
    }

    #[test]
    fn marker_line_completes_and_keeps_prefix() {
        let mut call = PendingCall::new(READY);
        assert_eq!(
            call.accept(LineEvent::stdout("done{ready}ignored")).unwrap(),
            Progress::Complete
        );
        assert_eq!(call.stdout, ["done"]);
    }

    #[test]
    fn bare_marker_adds_nothing() {
        let mut call = PendingCall::new(READY);
        assert_eq!(call.accept(LineEvent::stdout(READY)).unwrap(), Progress::Complete);
        assert!(call.stdout.is_empty());
    }

    #[test]
    fn stderr_never_completes() {
        let mut call = PendingCall::new(READY);
        assert_eq!(call.accept(LineEvent::stderr(READY)).unwrap(), Progress::Pending);
        assert_eq!(call.stderr, [READY]);
    }

    #[test]
    fn stdout_eof_is_broken_pipe() {
        let mut call = PendingCall::new(READY);
        let err = call.accept(LineEvent::Closed(StreamKind::Stdout)).unwrap_err();
        assert!(matches!(err, Error::BrokenPipe(_)));
        assert_eq!(
            call.accept(LineEvent::Closed(StreamKind::Stderr)).unwrap(),
            Progress::Pending
        );
    }

    #[tokio::test]
    async fn wait_collects_until_marker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(LineEvent::stdout("ECHO:-a")).unwrap();
        tx.send(LineEvent::stderr("warning")).unwrap();
        tx.send(LineEvent::stdout("ECHO:-b")).unwrap();
        tx.send(LineEvent::stdout("{ready}")).unwrap();
        tx.send(LineEvent::stderr("late warning")).unwrap();
        tx.send(LineEvent::stdout("next batch")).unwrap();

        let result = PendingCall::new(READY).wait(&mut rx).await.unwrap();
        assert_eq!(result.stdout_lines, ["ECHO:-a", "ECHO:-b"]);
        assert_eq!(result.stderr_lines, ["warning", "late warning"]);
    }

    #[tokio::test]
    async fn wait_fails_when_sender_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(LineEvent::stdout("partial")).unwrap();
        drop(tx);

        let err = PendingCall::new(READY).wait(&mut rx).await.unwrap_err();
        assert!(matches!(err, Error::BrokenPipe(_)));
    }

    #[tokio::test]
    async fn wait_fails_on_stdout_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(LineEvent::stdout("partial")).unwrap();
        tx.send(LineEvent::Closed(StreamKind::Stdout)).unwrap();

        let err = PendingCall::new(READY).wait(&mut rx).await.unwrap_err();
        assert!(err.poisons_session());
    }
}
