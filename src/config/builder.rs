//! Session configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libstayopen::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .executable("/usr/bin/exiftool")
//!     .args(["-common_args", "-n"])
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::options::{has_line_break, ProtocolOptions};
use crate::{Error, Result};

/// Configuration for one stay-open child process.
///
/// Use [`SessionConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    // Process options
    pub(crate) executable: PathBuf,
    pub(crate) extra_args: Vec<String>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,

    // Protocol
    pub(crate) protocol: ProtocolOptions,

    // Timeouts
    pub(crate) timeout: Option<Duration>,
    pub(crate) shutdown_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Path of the child executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Full argument list the child is launched with.
    pub fn command_args(&self) -> Vec<String> {
        self.protocol
            .startup_args
            .iter()
            .chain(self.extra_args.iter())
            .cloned()
            .collect()
    }

    /// Protocol tokens.
    pub fn protocol(&self) -> &ProtocolOptions {
        &self.protocol
    }

    /// Per-call wait limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Limit on waiting for the child to exit after the shutdown directive.
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    executable: Option<PathBuf>,
    extra_args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,
    protocol: ProtocolOptions,
    timeout: Option<Duration>,
    shutdown_timeout: Option<Duration>,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            executable: None,
            extra_args: Vec::new(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
            protocol: ProtocolOptions::default(),
            timeout: None,
            shutdown_timeout: None,
        }
    }
}

impl SessionConfigBuilder {
    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Path to the child executable. Required.
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Append one argument after the stay-open flags.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Append several arguments after the stay-open flags.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child process.
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables for the child process.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Whether the child inherits the parent environment (default: true).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    // -------------------------------------------------------------------------
    // Protocol
    // -------------------------------------------------------------------------

    /// Replace all protocol tokens at once.
    pub fn protocol(mut self, protocol: ProtocolOptions) -> Self {
        self.protocol = protocol;
        self
    }

    /// Override the flags that enable persistent mode.
    pub fn startup_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocol.startup_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Override the ready marker (default `{ready}`).
    pub fn sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.protocol.sentinel = sentinel.into();
        self
    }

    /// Override the execute trigger line (default `-execute`).
    pub fn execute_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.protocol.execute_trigger = trigger.into();
        self
    }

    /// Override the lines sent at shutdown (default `-stay_open`, `False`).
    pub fn shutdown_directive<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocol.shutdown_directive = lines.into_iter().map(Into::into).collect();
        self
    }

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------

    /// Bound the wait for each call's ready marker.
    ///
    /// A call that exceeds it fails with [`Error::ProtocolStall`] and faults
    /// the session. Without a timeout a silent child blocks the call forever.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound the wait for the child to exit after the shutdown directive.
    ///
    /// On expiry the child is killed.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<SessionConfig> {
        let executable = self
            .executable
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| Error::InvalidConfig("executable path is required".to_string()))?;

        self.protocol.validate().map_err(Error::InvalidConfig)?;

        if let Some(arg) = self.extra_args.iter().find(|a| has_line_break(a)) {
            return Err(Error::InvalidConfig(format!(
                "argument {arg:?} contains a line break"
            )));
        }

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        if self.shutdown_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig(
                "shutdown timeout must be non-zero".to_string(),
            ));
        }

        Ok(SessionConfig {
            executable,
            extra_args: self.extra_args,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
            protocol: self.protocol,
            timeout: self.timeout,
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}
