//! A minimal tool speaking the stay-open protocol, used by the integration tests.
//!
//! Test support only. It is not part of the library API and is built as a
//! binary so the tests can reach it through `CARGO_BIN_EXE_stayopen-echo`.
//!
//! Reads parameter lines from stdin. On `-execute` it prints `ECHO:<param>`
//! for every buffered parameter and then `{ready}`. `-stay_open` followed by
//! `False` (or stdin EOF) exits.
//!
//! Parameters with special meaning inside a batch:
//!
//! - `-emit=TEXT`: print `TEXT` instead of an echo
//! - `-stderr=TEXT`: print `TEXT` to stderr
//! - `-sleep=MS`: pause before continuing the batch
//! - `-ready-inline`: append the marker to the last output line
//! - `-trailing=TEXT`: print `TEXT` after the marker on the same line
//! - `-exit`: exit immediately without finishing the batch
//! - `-hang`: never finish the batch
//!
//! When `STAYOPEN_ECHO_EXIT_FILE` is set, leaving through the shutdown
//! directive writes `graceful` to that path before exiting.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

const READY: &str = "{ready}";
const EXIT_FILE_VAR: &str = "STAYOPEN_ECHO_EXIT_FILE";

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let mut pending: Vec<String> = Vec::new();
    let mut stay_open_value_next = false;

    for line in stdin.lock().lines() {
        let line = line?;

        if stay_open_value_next {
            stay_open_value_next = false;
            if line.eq_ignore_ascii_case("false") || line == "0" {
                if let Some(path) = std::env::var_os(EXIT_FILE_VAR) {
                    std::fs::write(path, "graceful")?;
                }
                return Ok(());
            }
            continue;
        }

        match line.as_str() {
            "-stay_open" => stay_open_value_next = true,
            "-execute" => run_batch(std::mem::take(&mut pending))?,
            _ => pending.push(line),
        }
    }

    Ok(())
}

fn run_batch(parameters: Vec<String>) -> io::Result<()> {
    let mut output: Vec<String> = Vec::new();
    let mut ready_inline = false;
    let mut trailing = String::new();

    for parameter in parameters {
        if let Some(text) = parameter.strip_prefix("-emit=") {
            output.push(text.to_string());
        } else if let Some(text) = parameter.strip_prefix("-stderr=") {
            let mut stderr = io::stderr().lock();
            stderr.write_all(text.as_bytes())?;
            stderr.write_all(b"\n")?;
            stderr.flush()?;
        } else if let Some(ms) = parameter.strip_prefix("-sleep=") {
            let ms = ms.parse().unwrap_or(0);
            thread::sleep(Duration::from_millis(ms));
        } else if let Some(text) = parameter.strip_prefix("-trailing=") {
            trailing = text.to_string();
        } else if parameter == "-ready-inline" {
            ready_inline = true;
        } else if parameter == "-exit" {
            std::process::exit(3);
        } else if parameter == "-hang" {
            loop {
                thread::sleep(Duration::from_secs(60));
            }
        } else {
            output.push(format!("ECHO:{parameter}"));
        }
    }

    let marker = format!("{READY}{trailing}");
    if ready_inline && !output.is_empty() {
        let last = output.len() - 1;
        output[last].push_str(&marker);
    } else {
        output.push(marker);
    }

    let mut stdout = io::stdout().lock();
    for line in &output {
        stdout.write_all(line.as_bytes())?;
        stdout.write_all(b"\n")?;
    }
    stdout.flush()
}
