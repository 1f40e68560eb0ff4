//! Process exit codes.
//!
//! Cargo only sees the runner's exit code, so test failures and runner
//! errors must map to different codes.

use crate::error::{Result, RunnerError};

/// Tests passed.
pub const EXIT_PASS: u8 = 0;
/// The firmware aborted.
pub const EXIT_TEST_FAIL: u8 = 1;
/// The runner itself failed (toolchain, emulator, configuration).
pub const EXIT_RUNNER_ERROR: u8 = 2;

/// Exit code for instance mode.
pub fn instance_exit_code(result: &Result<bool>) -> u8 {
    match result {
        Ok(true) => EXIT_PASS,
        Ok(false) => EXIT_TEST_FAIL,
        Err(_) => EXIT_RUNNER_ERROR,
    }
}

/// Exit code for invoker mode.
///
/// A failed `cargo test` passes its own exit code through. Termination by
/// signal, or a code that does not fit a `u8`, becomes a runner error.
pub fn invoker_exit_code(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => EXIT_PASS,
        Err(RunnerError::ToolFailed { status, .. }) => status
            .code()
            .and_then(|code| u8::try_from(code).ok())
            .unwrap_or(EXIT_RUNNER_ERROR),
        Err(_) => EXIT_RUNNER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_exit_codes() {
        assert_eq!(instance_exit_code(&Ok(true)), 0);
        assert_eq!(instance_exit_code(&Ok(false)), 1);
        assert_eq!(instance_exit_code(&Err(RunnerError::EmulatorExited)), 2);
    }

    #[test]
    fn test_invoker_success() {
        assert_eq!(invoker_exit_code(&Ok(())), 0);
        assert_eq!(invoker_exit_code(&Err(RunnerError::MissingHome)), 2);
    }

    #[cfg(unix)]
    mod status {
        use super::super::*;
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        fn cargo_failed(status: ExitStatus) -> Result<()> {
            Err(RunnerError::ToolFailed {
                tool: "cargo test".to_string(),
                status,
            })
        }

        #[test]
        fn test_invoker_passes_cargo_code_through() {
            // Raw wait status: exit code in the high byte
            assert_eq!(invoker_exit_code(&cargo_failed(ExitStatus::from_raw(101 << 8))), 101);
            assert_eq!(invoker_exit_code(&cargo_failed(ExitStatus::from_raw(1 << 8))), 1);
        }

        #[test]
        fn test_invoker_signal_is_runner_error() {
            // SIGKILL
            let status = ExitStatus::from_raw(9);
            assert_eq!(status.code(), None);
            assert_eq!(invoker_exit_code(&cargo_failed(status)), 2);
        }
    }
}
