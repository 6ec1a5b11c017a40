//! A blocking facade over [`CommandChannel`](crate::CommandChannel).
//!
//! For callers on plain threads. The channel owns a small tokio runtime
//! that drains the child's pipes; [`execute`](CommandChannel::execute)
//! blocks the calling thread until the ready marker arrives.
//!
//! ```ignore
//! use libstayopen::{blocking::CommandChannel, SessionConfig};
//!
//! let config = SessionConfig::builder().executable("exiftool").build()?;
//! let channel = CommandChannel::start(config)?;
//! let result = channel.execute(["-ver"])?;
//! // Dropping the last handle sends the shutdown directive and waits for exit.
//! ```

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};

use crate::config::SessionConfig;
use crate::process::SessionState;
use crate::protocol::ExecuteResult;
use crate::{Error, Result};

/// Blocking handle to one stay-open child process.
///
/// Clones share the child and may be used from different threads; calls
/// are serialized exactly as with the async channel.
///
/// # Cleanup
///
/// Dropping the last handle shuts the child down gracefully, so the
/// session is released on every exit path including early returns and
/// `?` propagation.
///
/// # Panics
///
/// Every method blocks on the internal runtime and panics if called from
/// within an async context. Use the async [`CommandChannel`](crate::CommandChannel) there.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    channel: crate::CommandChannel,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl CommandChannel {
    /// Start the child process on a dedicated runtime.
    pub fn start(config: SessionConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("stayopen-io")
            .enable_all()
            .build()
            .map_err(Error::io)?;
        let channel = runtime.block_on(crate::CommandChannel::start(config))?;

        Ok(Self {
            shared: Arc::new(Shared {
                channel,
                handle: runtime.handle().clone(),
                runtime: Some(runtime),
            }),
        })
    }

    /// Send `parameters` as one batch and block until its output is complete.
    ///
    /// See [`crate::CommandChannel::execute`] for the protocol and errors.
    pub fn execute<I, S>(&self, parameters: I) -> Result<ExecuteResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.shared
            .handle
            .block_on(self.shared.channel.execute(parameters))
    }

    /// Shut the child down now instead of when the last handle drops.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.handle.block_on(self.shared.channel.shutdown())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.handle.block_on(self.shared.channel.state())
    }

    /// Process ID of the child while it is alive.
    pub fn pid(&self) -> Option<u32> {
        self.shared.handle.block_on(self.shared.channel.pid())
    }

    /// The configuration this channel was started with.
    pub fn config(&self) -> &SessionConfig {
        self.shared.channel.config()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        if Handle::try_current().is_ok() {
            tracing::warn!("blocking channel dropped inside an async context, killing child");
        } else if let Err(e) = runtime.block_on(self.channel.shutdown()) {
            tracing::warn!(error = %e, "shutdown on drop failed");
        }

        runtime.shutdown_background();
    }
}
