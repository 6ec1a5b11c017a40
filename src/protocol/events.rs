//! Line events pushed from the output pumps to the call in flight.

use std::fmt;

/// Which child output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// One unit of output delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line, without its terminator.
    Line { stream: StreamKind, text: String },
    /// The stream reached EOF or failed; no more lines will follow.
    Closed(StreamKind),
}

impl LineEvent {
    pub fn stdout(text: impl Into<String>) -> Self {
        LineEvent::Line {
            stream: StreamKind::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        LineEvent::Line {
            stream: StreamKind::Stderr,
            text: text.into(),
        }
    }
}
