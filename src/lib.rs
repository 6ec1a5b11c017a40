//! # libstayopen
//!
//! Async Rust wrapper for command-line tools running in a stay-open batch
//! mode, such as `exiftool -stay_open True -@ -`.
//!
//! One child process is started and reused for every call, which avoids
//! paying the tool's startup cost per invocation. This library provides:
//! - Line-oriented framing of each call's stdout and stderr
//! - Serialization of concurrent callers against the single child
//! - Continuous draining of the child's pipes so it never blocks
//! - Clean two-phase shutdown
//!
//! ## Quick Start
//!
//! ```ignore
//! use libstayopen::{CommandChannel, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder()
//!         .executable("/usr/bin/exiftool")
//!         .build()?;
//!
//!     CommandChannel::scoped(config, |exiftool| async move {
//!         let result = exiftool.execute(["-s", "-ImageSize", "photo.jpg"]).await?;
//!         for line in result.stdout_lines() {
//!             println!("{line}");
//!         }
//!         Ok(())
//!     })
//!     .await
//! }
//! ```
//!
//! ## Blocking
//!
//! ```ignore
//! use libstayopen::blocking::CommandChannel;
//!
//! let exiftool = CommandChannel::start(config)?;
//! let result = exiftool.execute(["-xmp", "-b", "photo.jpg"])?;
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use libstayopen::SessionConfig;
//!
//! let config = SessionConfig::builder()
//!     .executable("/usr/bin/exiftool")
//!     .args(["-common_args", "-charset", "filename=utf8"])
//!     .timeout(Duration::from_secs(30))
//!     .shutdown_timeout(Duration::from_secs(5))
//!     .build()?;
//! ```

pub mod blocking;
mod channel;
pub mod config;
mod error;
pub mod process;
pub mod protocol;

pub use error::{Error, Result};

// Re-export the main channel type at crate root
pub use channel::CommandChannel;

// Re-export commonly used config types at crate root
pub use config::{ProtocolOptions, SessionConfig, SessionConfigBuilder};

// Re-export commonly used protocol types at crate root
pub use protocol::{ExecuteResult, LineEvent, StreamKind};

// Re-export commonly used process types at crate root
pub use process::{SessionState, StayOpenProcess};
