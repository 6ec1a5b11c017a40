//! Ready-marker detection.

/// Look for `sentinel` anywhere in `line`.
///
/// Returns the text before the marker when it is present, `None` otherwise.
/// Anything after the marker is dropped: the marker ends the batch, so
/// trailing text cannot belong to it.
pub fn split_at_marker<'a>(line: &'a str, sentinel: &str) -> Option<&'a str> {
    line.find(sentinel).map(|index| &line[..index])
}
