//! Console monitoring.
//!
//! Emulator output is mirrored to our stdout as it arrives and scanned for
//! one of two markers printed by ESP-IDF: the success marker when `app_main`
//! returns and the failure marker when the firmware aborts.

use crate::error::{Result, RunnerError};
use log::{debug, error};
use std::io::{Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Printed by ESP-IDF when `app_main` returns, i.e. all tests passed.
pub const SUCCESS_MARKER: &str = "Returned from app_main()";

/// Printed by ESP-IDF on abort, i.e. a test panicked.
pub const FAILURE_MARKER: &str = "abort() was called at PC";

/// Read buffer size for the console reader thread.
const READ_CHUNK_SIZE: usize = 4096;

/// Longest partial line kept for failure context.
const MAX_LINE_LEN: usize = 1024;

/// Result of a test binary run in the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Success marker seen.
    Passed,
    /// Failure marker seen.
    Failed,
}

impl Outcome {
    /// Whether the run passed.
    pub fn passed(self) -> bool {
        self == Outcome::Passed
    }
}

/// Incremental search for the result markers in a byte stream.
///
/// Markers split across chunks are found. If both markers appear, the one
/// earlier in the stream decides the outcome.
#[derive(Debug, Default)]
pub struct MarkerScanner {
    /// Tail of the previous chunks that could still start a marker.
    carry: Vec<u8>,
    /// Current incomplete line.
    line: Vec<u8>,
    /// Last complete non-empty line.
    last_line: Option<String>,
}

impl MarkerScanner {
    /// Create a scanner that has seen no output yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of output, returning the outcome once a marker
    /// has been seen.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Outcome> {
        let carried = self.carry.len();
        let mut window = std::mem::take(&mut self.carry);
        window.extend_from_slice(chunk);

        let found = [
            (SUCCESS_MARKER, Outcome::Passed),
            (FAILURE_MARKER, Outcome::Failed),
        ]
        .into_iter()
        .filter_map(|(marker, outcome)| find(&window, marker.as_bytes()).map(|pos| (pos, outcome)))
        .min_by_key(|&(pos, _)| pos);

        match found {
            Some((pos, outcome)) => {
                self.track_lines(&window[carried..pos.max(carried)]);
                Some(outcome)
            }
            None => {
                self.track_lines(&window[carried..]);
                let keep = longest_marker_len() - 1;
                let start = window.len().saturating_sub(keep);
                self.carry = window.split_off(start);
                None
            }
        }
    }

    /// Last complete console line before the point where scanning stopped.
    ///
    /// After a failure this is usually the panic message of the failing test.
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    fn track_lines(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.line).trim().replace('\r', "");
                if !line.is_empty() {
                    self.last_line = Some(line);
                }
                self.line.clear();
            } else if self.line.len() < MAX_LINE_LEN {
                self.line.push(b);
            }
        }
    }
}

fn longest_marker_len() -> usize {
    SUCCESS_MARKER.len().max(FAILURE_MARKER.len())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

enum ConsoleEvent {
    Data(Vec<u8>),
    Closed,
    Failed(std::io::Error),
}

/// Mirror `console` to `echo` until a marker appears or `timeout` elapses.
///
/// Reading happens on a separate thread so the wait stays bounded even when
/// the emulator produces no output at all. The reader thread exits once the
/// console closes.
pub fn wait_for_outcome<R, W>(console: R, echo: &mut W, timeout: Duration) -> Result<Outcome>
where
    R: Read + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || read_console(console, tx));

    let deadline = Instant::now() + timeout;
    let mut scanner = MarkerScanner::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(ConsoleEvent::Data(chunk)) => {
                echo.write_all(&chunk)?;
                echo.flush()?;
                if let Some(outcome) = scanner.feed(&chunk) {
                    if outcome == Outcome::Failed {
                        match scanner.last_line() {
                            Some(line) => error!("Test aborted after: {}", line),
                            None => error!("Test aborted"),
                        }
                    }
                    return Ok(outcome);
                }
            }
            Ok(ConsoleEvent::Failed(e)) => return Err(e.into()),
            Ok(ConsoleEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                return Err(RunnerError::EmulatorExited)
            }
            Err(RecvTimeoutError::Timeout) => return Err(RunnerError::Timeout { limit: timeout }),
        }
    }
}

fn read_console<R: Read>(mut console: R, tx: mpsc::Sender<ConsoleEvent>) {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    loop {
        let event = match console.read(&mut buf) {
            Ok(0) => ConsoleEvent::Closed,
            Ok(n) => ConsoleEvent::Data(buf[..n].to_vec()),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => ConsoleEvent::Failed(e),
        };
        let done = !matches!(event, ConsoleEvent::Data(_));
        if tx.send(event).is_err() {
            debug!("Console receiver gone, stopping reader");
            return;
        }
        if done {
            return;
        }
    }
}
