//! Protocol-level options for the stay-open line protocol.

use serde::{Deserialize, Serialize};

use crate::protocol::{
    ARGFILE_FLAG, DEFAULT_EXECUTE_TRIGGER, DEFAULT_SENTINEL, STAY_OPEN_FLAG, STDIN_ARGFILE,
};

/// The literal tokens exchanged with the child process.
///
/// The defaults match exiftool's `-stay_open` mode. Tools with a different
/// batch protocol can override each token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolOptions {
    /// Arguments that put the child into persistent mode reading from stdin.
    pub startup_args: Vec<String>,
    /// Marker printed by the child after the last output line of a command.
    pub sentinel: String,
    /// Line that tells the child to execute the parameters sent so far.
    pub execute_trigger: String,
    /// Lines that tell the child to leave persistent mode and exit.
    pub shutdown_directive: Vec<String>,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            startup_args: vec![
                STAY_OPEN_FLAG.to_string(),
                "True".to_string(),
                ARGFILE_FLAG.to_string(),
                STDIN_ARGFILE.to_string(),
            ],
            sentinel: DEFAULT_SENTINEL.to_string(),
            execute_trigger: DEFAULT_EXECUTE_TRIGGER.to_string(),
            shutdown_directive: vec![STAY_OPEN_FLAG.to_string(), "False".to_string()],
        }
    }
}

impl ProtocolOptions {
    /// Check that every token can be sent or matched as a single line.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.sentinel.is_empty() {
            return Err("sentinel must not be empty".to_string());
        }
        if has_line_break(&self.sentinel) {
            return Err("sentinel must not contain line breaks".to_string());
        }
        if self.execute_trigger.is_empty() {
            return Err("execute trigger must not be empty".to_string());
        }
        if has_line_break(&self.execute_trigger) {
            return Err("execute trigger must not contain line breaks".to_string());
        }
        if let Some(line) = self.shutdown_directive.iter().find(|l| has_line_break(l)) {
            return Err(format!("shutdown directive line {line:?} contains a line break"));
        }
        Ok(())
    }

    /// Check that a batch of parameters cannot alter the framing.
    ///
    /// Rejects line breaks, the execute trigger (also exiftool's numbered
    /// `-execute<NUM>` form), and the first shutdown directive line when it
    /// is last or followed by the rest of the directive. Either would make
    /// the child end a batch or the session in the middle of a call.
    pub(crate) fn check_parameters(&self, parameters: &[&str]) -> Result<(), String> {
        for (index, parameter) in parameters.iter().copied().enumerate() {
            if has_line_break(parameter) {
                return Err(format!("{parameter:?} contains a line break"));
            }
            if self.is_execute_trigger(parameter) {
                return Err(format!("{parameter:?} would execute the batch early"));
            }
            if self.starts_shutdown(&parameters[index..]) {
                return Err(format!("{parameter:?} would end persistent mode"));
            }
        }
        Ok(())
    }

    fn is_execute_trigger(&self, parameter: &str) -> bool {
        parameter
            .strip_prefix(self.execute_trigger.as_str())
            .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
    }

    fn starts_shutdown(&self, rest: &[&str]) -> bool {
        let Some((first, tail)) = self.shutdown_directive.split_first() else {
            return false;
        };
        if rest[0] != first.as_str() {
            return false;
        }
        // A trailing directive flag would take the execute trigger as its value.
        match (rest.get(1), tail.first()) {
            (None, _) | (_, None) => true,
            (Some(next), Some(expected)) => next.eq_ignore_ascii_case(expected),
        }
    }
}

pub(crate) fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}
