//! Error types for the runner.
//!
//! Toolchain problems (a tool could not start or exited non-zero, the
//! emulator hung or died) are errors. A test that fails inside the emulator
//! is not: it is reported as `Ok(false)` by [`crate::run_instance`].

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Errors that can occur while building, emulating or invoking tests.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// `HOME` is not set, so the emulator cannot be located.
    #[error("HOME is not set, cannot locate the emulator")]
    MissingHome,

    /// Failed to execute an external command.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran but exited unsuccessfully.
    #[error("{tool} failed ({status})")]
    ToolFailed { tool: String, status: ExitStatus },

    /// A piped stdio handle was not available on a spawned child.
    #[error("failed to capture stdio of {program}")]
    NoStdio { program: String },

    /// Neither marker appeared before the deadline.
    #[error("timeout: no test result after {} seconds", .limit.as_secs())]
    Timeout { limit: Duration },

    /// Emulator output ended before either marker was seen.
    #[error("emulator output ended without a test result")]
    EmulatorExited,

    /// A path cannot be passed to a tool as-is.
    #[error("unsupported path: {}", .path.display())]
    InvalidPath { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RunnerError>;
