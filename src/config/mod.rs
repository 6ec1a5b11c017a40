//! Configuration for a stay-open session.
//!
//! This module provides:
//!
//! - [`SessionConfig`] and [`SessionConfigBuilder`] for configuring the child process
//! - [`ProtocolOptions`] for the tokens of the line protocol
//!
//! # Example
//!
//! ```ignore
//! use libstayopen::config::SessionConfig;
//!
//! // exiftool defaults: -stay_open True -@ -, {ready}, -execute
//! let config = SessionConfig::builder()
//!     .executable("/usr/local/bin/exiftool")
//!     .build()?;
//!
//! // Another tool with its own batch protocol
//! let config = SessionConfig::builder()
//!     .executable("mytool")
//!     .startup_args(["--batch"])
//!     .sentinel("<<end>>")
//!     .execute_trigger("run")
//!     .shutdown_directive(["quit"])
//!     .build()?;
//! ```

pub mod builder;
pub mod options;

pub use builder::{SessionConfig, SessionConfigBuilder};
pub use options::ProtocolOptions;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accessible() {
        let _ = SessionConfig::builder();
        let _: ProtocolOptions = ProtocolOptions::default();
    }
}
