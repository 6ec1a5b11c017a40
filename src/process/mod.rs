//! Process management for the stay-open child.
//!
//! One child is started per session and kept alive across calls. Its
//! output streams are drained continuously by background tasks so the
//! child never blocks on a full pipe.
//!
//! # Architecture
//!
//! ```text
//! libstayopen                               child (e.g. exiftool)
//! ┌────────────────┐                        ┌─────────────┐
//! │ CommandWriter  │───stdin (parameters)──▶│             │
//! │ pump (stdout)  │◀──stdout (+ {ready})───│             │
//! │ pump (stderr)  │◀──stderr (diagnostics)─│             │
//! └──────┬─────────┘                        └─────────────┘
//!        │ LineEvent
//!        ▼
//!   LineRouter ──▶ Subscription of the call in flight (or dropped)
//! ```

mod io;
mod spawn;

pub use io::{CommandWriter, LineRouter, Subscription};
pub use spawn::{SessionState, StayOpenProcess};
