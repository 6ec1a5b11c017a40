//! Process spawning and lifecycle management.

use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::io::{pump_lines, CommandWriter, LineRouter, Subscription};
use crate::config::SessionConfig;
use crate::protocol::{LineEvent, StreamKind};
use crate::{Error, Result};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Lifecycle of a stay-open session.
///
/// ```text
/// Running ──shutdown──▶ ShuttingDown ──exit──▶ Terminated
///    │                                             ▲
///    └──failed call──▶ Faulted ────────kill────────┘
/// ```
///
/// A session only exists once its child has been started, so there is no
/// unstarted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepting calls.
    Running,
    /// A call failed mid-protocol; only shutdown is allowed.
    Faulted,
    /// Shutdown directive sent, waiting for the child to exit.
    ShuttingDown,
    /// Child has exited. Final.
    Terminated,
}

impl SessionState {
    /// Whether shutdown has started or finished.
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::ShuttingDown | SessionState::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Faulted => write!(f, "faulted"),
            SessionState::ShuttingDown => write!(f, "shutting down"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// A running stay-open child process.
///
/// Owns the child handle, its stdin writer and the two tasks draining
/// stdout and stderr. The session knows about lines, not about markers;
/// protocol handling lives in [`CommandChannel`](crate::CommandChannel).
///
/// # Cleanup
///
/// Call [`shutdown`](Self::shutdown) before dropping. Dropping a session
/// that is still running kills the child.
pub struct StayOpenProcess {
    child: Child,
    writer: CommandWriter,
    router: LineRouter,
    pumps: [JoinHandle<()>; 2],
    state: SessionState,
    executable: String,
}

impl StayOpenProcess {
    /// Launch the child in persistent mode and start draining its output.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(config: &SessionConfig) -> Result<Self> {
        let executable = config.executable().display().to_string();

        let mut cmd = build_command(config);
        let mut child = cmd.spawn().map_err(|source| Error::ProcessStart {
            path: executable.clone(),
            source,
        })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.start_kill();
            return Err(Error::ProcessStart {
                path: executable,
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "child standard streams were not captured",
                ),
            });
        };

        let router = LineRouter::new();
        let pumps = [
            tokio::spawn(pump_lines(stdout, StreamKind::Stdout, router.clone())),
            tokio::spawn(pump_lines(stderr, StreamKind::Stderr, router.clone())),
        ];

        tracing::debug!(
            executable = %executable,
            pid = ?child.id(),
            args = ?config.command_args(),
            "started stay-open process"
        );

        Ok(Self {
            child,
            writer: CommandWriter::new(stdin),
            router,
            pumps,
            state: SessionState::Running,
            executable,
        })
    }

    /// Write one line to the child's stdin.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        self.writer.write_line(text).await
    }

    /// Route subsequent output lines to a new receiver until the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe(&self) -> (Subscription, tokio::sync::mpsc::UnboundedReceiver<LineEvent>) {
        self.router.subscribe()
    }

    /// Send the shutdown directive, close stdin and wait for the child to exit.
    ///
    /// With a `timeout`, a child still running after it is killed. Calling
    /// this on a terminated session does nothing.
    pub async fn shutdown(&mut self, directive: &[String], timeout: Option<Duration>) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.state = SessionState::ShuttingDown;

        for line in directive {
            if let Err(e) = self.writer.write_line(line).await {
                tracing::warn!(error = %e, "failed to send shutdown directive");
                break;
            }
        }
        if let Err(e) = self.writer.close().await {
            tracing::debug!(error = %e, "closing child stdin failed");
        }

        let status = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    tracing::warn!(
                        executable = %self.executable,
                        "child did not exit within {:?}, killing it",
                        limit
                    );
                    self.child.kill().await.map_err(Error::io)?;
                    self.child.wait().await
                }
            },
            None => self.child.wait().await,
        };

        self.finish(status)
    }

    /// Kill the child and wait for it to exit.
    pub async fn kill(&mut self) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.state = SessionState::ShuttingDown;
        // Already exited children report an error here; wait() below still reaps.
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "kill signal not delivered");
        }
        let _ = self.writer.close().await;
        let status = self.child.wait().await;
        self.finish(status)
    }

    fn finish(&mut self, status: std::io::Result<ExitStatus>) -> Result<()> {
        self.state = SessionState::Terminated;
        let status = status.map_err(Error::io)?;
        tracing::debug!(executable = %self.executable, %status, "stay-open process exited");
        Ok(())
    }

    pub(crate) fn mark_faulted(&mut self) {
        if self.state == SessionState::Running {
            self.state = SessionState::Faulted;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the process ID of the child, if it has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        self.state != SessionState::Terminated && self.child.id().is_some()
    }

    /// Path the child was launched from.
    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl fmt::Debug for StayOpenProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StayOpenProcess")
            .field("executable", &self.executable)
            .field("pid", &self.child.id())
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for StayOpenProcess {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
        if self.state != SessionState::Terminated {
            tracing::warn!(
                executable = %self.executable,
                "stay-open process dropped without shutdown, killing it"
            );
            let _ = self.child.start_kill();
        }
    }
}

/// Build a tokio Command from the config.
fn build_command(config: &SessionConfig) -> Command {
    let mut cmd = Command::new(config.executable());
    cmd.args(config.command_args());

    if let Some(dir) = config.working_directory() {
        cmd.current_dir(dir);
    }

    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env_vars);

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(executable: &str) -> SessionConfig {
        SessionConfig::builder()
            .executable(executable)
            .arg("-charset")
            .build()
            .unwrap()
    }

    #[test]
    fn build_command_uses_stay_open_args() {
        let cmd = build_command(&config_for("exiftool"));
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "exiftool");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["-stay_open", "True", "-@", "-", "-charset"]);
    }

    #[test]
    fn build_command_applies_environment() {
        let config = SessionConfig::builder()
            .executable("exiftool")
            .working_directory("/tmp")
            .env("LC_ALL", "C")
            .build()
            .unwrap();
        let cmd = build_command(&config);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_current_dir(), Some(std::path::Path::new("/tmp")));
        assert!(std_cmd
            .get_envs()
            .any(|(k, v)| k == "LC_ALL" && v == Some(std::ffi::OsStr::new("C"))));
    }

    #[tokio::test]
    async fn start_reports_missing_executable() {
        let err = StayOpenProcess::start(&config_for("/nonexistent/stay-open-tool"))
            .await
            .unwrap_err();
        match err {
            Error::ProcessStart { path, source } => {
                assert_eq!(path, "/nonexistent/stay-open-tool");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ProcessStart, got {other:?}"),
        }
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Running.to_string(), "running");
        assert_eq!(SessionState::ShuttingDown.to_string(), "shutting down");
        assert!(SessionState::Terminated.is_closed());
        assert!(!SessionState::Faulted.is_closed());
    }

    #[test]
    fn process_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StayOpenProcess>();
        assert_send_sync::<SessionState>();
    }
}
