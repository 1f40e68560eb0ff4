//! Invoker mode: run `cargo test` with this program as the target runner.
//!
//! Cargo then calls us once per test binary (instance mode) and aggregates
//! the exit codes itself.

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use log::{debug, error, info};
use std::path::Path;
use std::process::Command;

/// `--config` value overriding the runner for `triple`.
///
/// The path is embedded in a single-quoted TOML string, so paths containing
/// `'` (or that are not valid UTF-8) are rejected.
pub fn runner_override(triple: &str, runner: &Path) -> Result<String> {
    let runner_str = runner
        .to_str()
        .filter(|s| !s.contains('\''))
        .ok_or_else(|| RunnerError::InvalidPath {
            path: runner.to_path_buf(),
        })?;
    Ok(format!("target.{}.runner = '{}'", triple, runner_str))
}

/// Run `cargo test` with `runner` registered as the target runner.
///
/// Fails with [`RunnerError::ToolFailed`] carrying cargo's exit status if
/// the build or any test binary failed.
pub fn run_invoker(config: &RunnerConfig, runner: &Path) -> Result<()> {
    let runner_config = runner_override(&config.target_triple, runner)?;
    info!("Running cargo test for {}", config.target_triple);
    debug!("--config {}", runner_config);

    let status = Command::new(&config.cargo)
        .args(["test", "--config", &runner_config])
        .status()
        .map_err(|source| RunnerError::Spawn {
            program: config.cargo.display().to_string(),
            source,
        })?;

    if !status.success() {
        error!("cargo test failed ({})", status);
        return Err(RunnerError::ToolFailed {
            tool: "cargo test".to_string(),
            status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_override() {
        let value = runner_override(
            "xtensa-esp32-espidf",
            Path::new("/home/dev/.cargo/bin/esp32-qemu-runner"),
        )
        .unwrap();
        assert_eq!(
            value,
            "target.xtensa-esp32-espidf.runner = '/home/dev/.cargo/bin/esp32-qemu-runner'"
        );
    }

    #[test]
    fn test_runner_override_rejects_quote() {
        let result = runner_override("xtensa-esp32-espidf", Path::new("/tmp/it's/runner"));
        assert!(matches!(result, Err(RunnerError::InvalidPath { .. })));
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use crate::testutil::write_script;

        #[test]
        fn test_invoker_passes_runner_to_cargo() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = RunnerConfig::with_home(dir.path());
            config.cargo = write_script(dir.path(), "cargo", r#"printf '%s\n' "$@" > "$0.args""#);

            run_invoker(&config, Path::new("/opt/runner")).unwrap();

            let args = std::fs::read_to_string(dir.path().join("cargo.args")).unwrap();
            assert_eq!(
                args,
                "test\n--config\ntarget.xtensa-esp32-espidf.runner = '/opt/runner'\n"
            );
        }

        #[test]
        fn test_invoker_reports_cargo_status() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = RunnerConfig::with_home(dir.path());
            config.cargo = write_script(dir.path(), "cargo", "exit 101");

            let err = run_invoker(&config, Path::new("/opt/runner")).unwrap_err();
            match err {
                RunnerError::ToolFailed { status, .. } => assert_eq!(status.code(), Some(101)),
                other => panic!("unexpected error: {}", other),
            }
        }
    }
}
