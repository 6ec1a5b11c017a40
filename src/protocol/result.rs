//! The outcome of one executed batch.

use serde::{Deserialize, Serialize};

/// Lines captured from the child for one call, in emission order.
///
/// The ready marker never appears in `stdout_lines`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
}

impl ExecuteResult {
    pub fn new(stdout_lines: Vec<String>, stderr_lines: Vec<String>) -> Self {
        Self {
            stdout_lines,
            stderr_lines,
        }
    }

    pub fn stdout_lines(&self) -> &[String] {
        &self.stdout_lines
    }

    pub fn stderr_lines(&self) -> &[String] {
        &self.stderr_lines
    }

    /// Stdout joined with `\n`.
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }

    /// Stderr joined with `\n`.
    pub fn stderr(&self) -> String {
        self.stderr_lines.join("\n")
    }

    /// True when the child produced no output at all.
    pub fn is_empty(&self) -> bool {
        self.stdout_lines.is_empty() && self.stderr_lines.is_empty()
    }

    /// True when the child wrote anything to stderr.
    ///
    /// exiftool reports per-file problems (missing files, unsupported
    /// formats) this way while still completing the batch.
    pub fn has_errors(&self) -> bool {
        !self.stderr_lines.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.stdout_lines, self.stderr_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn joined_text() {
        let result = ExecuteResult::new(lines(&["a", "b"]), lines(&["warn"]));
        assert_eq!(result.stdout(), "a\nb");
        assert_eq!(result.stderr(), "warn");
        assert!(result.has_errors());
        assert!(!result.is_empty());
    }

    #[test]
    fn empty_result() {
        let result = ExecuteResult::default();
        assert!(result.is_empty());
        assert!(!result.has_errors());
        assert_eq!(result.stdout(), "");
    }

    #[test]
    fn serializes_as_line_arrays() {
        let result = ExecuteResult::new(lines(&["ECHO:-a"]), Vec::new());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"stdout_lines": ["ECHO:-a"], "stderr_lines": []})
        );
    }
}
