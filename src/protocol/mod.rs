//! The stay-open line protocol.
//!
//! Each logical call is a batch of parameter lines followed by an execute
//! trigger. The child answers with zero or more stdout lines and then prints
//! the ready marker, which may share a line with the last output:
//!
//! ```text
//! parent → child (stdin)         child → parent (stdout)
//! -xmp                           ...
//! -b                             <x:xmpmeta ...>
//! image.jpg                      {ready}
//! -execute
//! ```
//!
//! Stderr carries free-form diagnostics with no marker. Nothing on the wire
//! identifies which command a line belongs to, so attribution relies on
//! exactly one batch being in flight per process.

mod call;
mod events;
mod marker;
mod result;

pub(crate) use call::PendingCall;
pub use events::{LineEvent, StreamKind};
pub use marker::split_at_marker;
pub use result::ExecuteResult;

/// Marker printed by exiftool after the output of each executed batch.
pub const DEFAULT_SENTINEL: &str = "{ready}";

/// Line that makes the child execute the parameters received so far.
pub const DEFAULT_EXECUTE_TRIGGER: &str = "-execute";

/// Flag toggling persistent mode; followed by `True` at startup and `False` at shutdown.
pub const STAY_OPEN_FLAG: &str = "-stay_open";

/// Flag naming an argument file to read parameters from.
pub const ARGFILE_FLAG: &str = "-@";

/// Argument file name meaning standard input.
pub const STDIN_ARGFILE: &str = "-";
