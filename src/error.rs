use std::time::Duration;

/// Errors that can occur when driving a stay-open process.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time or before any I/O
/// - Spawn errors: failed to start the child process
/// - Pipe errors: the child stopped reading or writing mid-call
/// - Lifecycle errors: the session is closed or in an unknown state
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A parameter cannot be sent as a single protocol line.
    ///
    /// Parameters containing line breaks would be split into several
    /// arguments by the child, so they are rejected before anything is written.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// Failed to launch the child executable.
    #[error("failed to start {path}: {source}")]
    ProcessStart {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Pipe errors
    // -------------------------------------------------------------------------
    /// The child exited or closed one of its streams during a call.
    #[error("broken pipe to child process: {0}")]
    BrokenPipe(#[source] std::io::Error),

    /// The ready marker did not arrive within the configured timeout.
    #[error("no ready marker received after {0:?}")]
    ProtocolStall(Duration),

    /// IO error while managing the child process.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Lifecycle errors
    // -------------------------------------------------------------------------
    /// The session was shut down.
    #[error("session is closed")]
    SessionClosed,

    /// A previous call failed mid-protocol; output can no longer be attributed.
    #[error("session is faulted by an earlier failed call")]
    Faulted,
}

/// A specialized Result type for libstayopen operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Create a broken pipe error from a failed stream operation.
    pub fn broken_pipe(source: std::io::Error) -> Self {
        Self::BrokenPipe(source)
    }

    /// Check if this error leaves the session unusable.
    ///
    /// After any of these the channel refuses further calls with
    /// [`Error::Faulted`]; the only remaining operation is shutdown.
    pub fn poisons_session(&self) -> bool {
        matches!(
            self,
            Error::BrokenPipe(_) | Error::ProtocolStall(_) | Error::Faulted
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
