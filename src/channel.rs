//! Request/response framing over a stay-open process.
//!
//! [`CommandChannel`] turns the child's unstructured line streams into one
//! [`ExecuteResult`] per call.
//!
//! # Example
//!
//! ```ignore
//! use libstayopen::{CommandChannel, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder().executable("exiftool").build()?;
//!     let channel = CommandChannel::start(config).await?;
//!
//!     let result = channel.execute(["-xmp", "-b", "image.jpg"]).await?;
//!     println!("{}", result.stdout());
//!
//!     channel.shutdown().await
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::config::SessionConfig;
use crate::process::{SessionState, StayOpenProcess};
use crate::protocol::{ExecuteResult, PendingCall};
use crate::{Error, Result};

/// A shared handle to one stay-open child process.
///
/// # Thread Safety
///
/// `CommandChannel` is `Send + Sync` and cheap to clone; all clones drive
/// the same child. Calls are serialized: a call holds the session's turn
/// from its first parameter line until its ready marker has been read, and
/// waiting callers are admitted in the order they queued.
///
/// # Faults
///
/// A call that fails after it started writing ([`Error::BrokenPipe`],
/// [`Error::ProtocolStall`], or a caller dropping the future mid-call)
/// leaves unread output of unknown length in the pipes. The channel then
/// refuses further calls with [`Error::Faulted`]; shut it down and start a
/// new one.
///
/// # Cleanup
///
/// Call [`shutdown`](Self::shutdown) when done, or use
/// [`scoped`](Self::scoped). Dropping the last handle of a running channel
/// kills the child instead of letting it exit cleanly.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: SessionConfig,
    process: Mutex<StayOpenProcess>,
}

impl CommandChannel {
    /// Start the child process and return a channel to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessStart`] if the executable cannot be launched.
    pub async fn start(config: SessionConfig) -> Result<Self> {
        let process = StayOpenProcess::start(&config).await?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                process: Mutex::new(process),
            }),
        })
    }

    /// Start a channel, run `body` with it, then shut it down.
    ///
    /// Shutdown happens whether `body` succeeds or fails. An error from
    /// `body` takes precedence over one from shutdown.
    ///
    /// ```ignore
    /// let tags = CommandChannel::scoped(config, |channel| async move {
    ///     channel.execute(["-s", "image.jpg"]).await
    /// })
    /// .await?;
    /// ```
    pub async fn scoped<F, Fut, T>(config: SessionConfig, body: F) -> Result<T>
    where
        F: FnOnce(CommandChannel) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let channel = Self::start(config).await?;
        let outcome = body(channel.clone()).await;
        let closed = channel.shutdown().await;

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "shutdown after failed body also failed");
                }
                Err(e)
            }
            (Ok(_), Err(e)) => Err(e),
        }
    }

    /// Send `parameters` as one batch and wait for its output.
    ///
    /// Each parameter is written as its own line, followed by the execute
    /// trigger. The call returns once the ready marker has been read from
    /// stdout; the marker and anything after it on its line are stripped.
    ///
    /// Without a configured [`timeout`](crate::SessionConfigBuilder::timeout)
    /// a child that never prints the marker blocks this call forever.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if a parameter contains a line break, is
    ///   the execute trigger, or starts the shutdown directive
    /// - [`Error::SessionClosed`] after shutdown
    /// - [`Error::Faulted`] after an earlier call failed mid-protocol
    /// - [`Error::BrokenPipe`] if the child stops reading or closes stdout
    /// - [`Error::ProtocolStall`] if the timeout expires
    pub async fn execute<I, S>(&self, parameters: I) -> Result<ExecuteResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parameters: Vec<S> = parameters.into_iter().collect();
        let lines: Vec<&str> = parameters.iter().map(AsRef::<str>::as_ref).collect();

        let protocol = &self.inner.config.protocol;
        protocol
            .check_parameters(&lines)
            .map_err(Error::InvalidParameter)?;

        let mut turn = Turn::acquire(&self.inner.process).await?;

        for line in &lines {
            turn.process.write_line(line).await?;
        }

        let (subscription, mut events) = turn.process.subscribe();
        turn.process.write_line(&protocol.execute_trigger).await?;

        let pending = PendingCall::new(&protocol.sentinel).wait(&mut events);
        let outcome = match self.inner.config.timeout {
            Some(limit) => with_timeout(limit, pending).await,
            None => pending.await,
        };
        drop(subscription);

        let result = outcome?;
        turn.complete();

        tracing::debug!(
            parameters = parameters.len(),
            stdout_lines = result.stdout_lines.len(),
            stderr_lines = result.stderr_lines.len(),
            "batch executed"
        );
        Ok(result)
    }

    /// Tell the child to leave persistent mode and wait for it to exit.
    ///
    /// Waits for a call in flight to finish first. A faulted child is
    /// killed instead, since it may still be busy with the failed batch.
    /// Calling this again after it succeeded does nothing.
    pub async fn shutdown(&self) -> Result<()> {
        let mut process = self.inner.process.lock().await;
        match process.state() {
            SessionState::Terminated => Ok(()),
            SessionState::Running => {
                tracing::debug!(executable = process.executable(), "shutting down");
                process
                    .shutdown(
                        &self.inner.config.protocol.shutdown_directive,
                        self.inner.config.shutdown_timeout,
                    )
                    .await
            }
            state @ (SessionState::Faulted | SessionState::ShuttingDown) => {
                tracing::warn!(
                    executable = process.executable(),
                    %state,
                    "killing stay-open process"
                );
                process.kill().await
            }
        }
    }

    /// Current lifecycle state. Waits for a call in flight to finish.
    pub async fn state(&self) -> SessionState {
        self.inner.process.lock().await.state()
    }

    /// Process ID of the child while it is alive.
    pub async fn pid(&self) -> Option<u32> {
        self.inner.process.lock().await.pid()
    }

    /// The configuration this channel was started with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

/// The exclusive right to drive the session for one call.
///
/// Dropped without [`complete`](Self::complete), it marks the session
/// faulted: the call stopped somewhere between its first write and its
/// marker, so the pipes may still hold its output.
struct Turn<'a> {
    process: MutexGuard<'a, StayOpenProcess>,
    completed: bool,
}

impl<'a> Turn<'a> {
    async fn acquire(process: &'a Mutex<StayOpenProcess>) -> Result<Turn<'a>> {
        let process = process.lock().await;
        match process.state() {
            SessionState::Running => Ok(Turn {
                process,
                completed: false,
            }),
            SessionState::Faulted => Err(Error::Faulted),
            SessionState::ShuttingDown | SessionState::Terminated => Err(Error::SessionClosed),
        }
    }

    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                executable = self.process.executable(),
                "call ended before its ready marker, session faulted"
            );
            self.process.mark_faulted();
        }
    }
}

/// Run `future` with a timeout, mapping expiry to [`Error::ProtocolStall`].
async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::ProtocolStall(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandChannel>();
    }

    #[tokio::test]
    async fn with_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn with_timeout_expires() {
        let result = with_timeout(Duration::from_millis(1), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, Error>(42)
        })
        .await;
        assert!(matches!(result, Err(Error::ProtocolStall(_))));
    }

    #[tokio::test]
    async fn with_timeout_inner_error() {
        let result: Result<()> =
            with_timeout(Duration::from_secs(1), async { Err(Error::SessionClosed) }).await;
        assert!(matches!(result, Err(Error::SessionClosed)));
    }

    #[tokio::test]
    async fn start_failure_surfaces_process_start() {
        let config = SessionConfig::builder()
            .executable("/nonexistent/stay-open-tool")
            .build()
            .unwrap();
        let err = CommandChannel::start(config).await.unwrap_err();
        assert!(matches!(err, Error::ProcessStart { .. }));
    }
}
