//! Test utilities for libstayopen integration tests.

#![allow(dead_code)]

use std::time::Duration;

use libstayopen::{CommandChannel, SessionConfig, SessionConfigBuilder};

/// Path of the `stayopen-echo` stand-in built alongside the tests.
pub const ECHO_TOOL: &str = env!("CARGO_BIN_EXE_stayopen-echo");

/// Variable naming the file the stand-in writes on a directive exit.
pub const EXIT_FILE_VAR: &str = "STAYOPEN_ECHO_EXIT_FILE";

/// Builder preconfigured for the echo stand-in.
pub fn echo_builder() -> SessionConfigBuilder {
    SessionConfig::builder()
        .executable(ECHO_TOOL)
        .shutdown_timeout(Duration::from_secs(10))
}

pub fn echo_config() -> SessionConfig {
    echo_builder().build().expect("echo config should build")
}

/// Start a channel to the echo stand-in.
pub async fn start_echo() -> CommandChannel {
    CommandChannel::start(echo_config())
        .await
        .expect("echo stand-in should start")
}

/// The lines the stand-in prints for plain parameters.
pub fn echoed(parameters: &[&str]) -> Vec<String> {
    parameters.iter().map(|p| format!("ECHO:{p}")).collect()
}
