//! Runner configuration.
//!
//! Everything the runner needs to know about its environment lives in
//! [`RunnerConfig`], which is passed explicitly to [`crate::run_instance`]
//! and [`crate::run_invoker`]. Defaults match the standard ESP32 QEMU setup.

use crate::error::{Result, RunnerError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Emulator location relative to the home directory.
pub const QEMU_RELATIVE_PATH: &str = "qemu-xtensa/bin/qemu-system-xtensa";

/// Rust target triple whose runner gets overridden.
pub const RUST_TARGET: &str = "xtensa-esp32-espidf";

/// Chip type passed to espflash and the QEMU machine type.
pub const CHIP: &str = "esp32";

/// Partition table, relative to the crate being tested.
pub const PARTITION_TABLE: &str = "../partition_table.csv";

/// Maximum time to wait for a test result.
pub const TEST_TIMEOUT_SECS: u64 = 120;

/// Time the emulator gets to exit after being asked to quit.
pub const QUIT_GRACE_MILLIS: u64 = 1000;

/// Configuration for one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Path to `qemu-system-xtensa`.
    pub emulator: PathBuf,
    /// Image merge tool (`espflash`).
    pub merge_tool: PathBuf,
    /// Cargo executable used in invoker mode.
    pub cargo: PathBuf,
    /// Chip identifier for espflash and QEMU.
    pub chip: String,
    /// Partition table passed to espflash.
    pub partition_table: PathBuf,
    /// Target triple for the `--config` runner override.
    pub target_triple: String,
    /// Upper bound on waiting for a result marker.
    pub timeout: Duration,
    /// How long to wait for the emulator to exit before killing it.
    pub quit_grace: Duration,
    /// Parent directory for the temporary image; system temp dir if `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl RunnerConfig {
    /// Build the default configuration from the `HOME` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::from_home_var(std::env::var_os("HOME"))
    }

    /// Build the default configuration from a `HOME` value, if there is one.
    pub fn from_home_var(home: Option<OsString>) -> Result<Self> {
        let home = home.ok_or(RunnerError::MissingHome)?;
        Ok(Self::with_home(home))
    }

    /// Build the default configuration for the given home directory.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        Self {
            emulator: home.as_ref().join(QEMU_RELATIVE_PATH),
            merge_tool: PathBuf::from("espflash"),
            cargo: PathBuf::from("cargo"),
            chip: CHIP.to_string(),
            partition_table: PathBuf::from(PARTITION_TABLE),
            target_triple: RUST_TARGET.to_string(),
            timeout: Duration::from_secs(TEST_TIMEOUT_SECS),
            quit_grace: Duration::from_millis(QUIT_GRACE_MILLIS),
            scratch_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_home_defaults() {
        let config = RunnerConfig::with_home("/home/dev");
        assert_eq!(
            config.emulator,
            PathBuf::from("/home/dev/qemu-xtensa/bin/qemu-system-xtensa")
        );
        assert_eq!(config.merge_tool, PathBuf::from("espflash"));
        assert_eq!(config.chip, "esp32");
        assert_eq!(config.partition_table, PathBuf::from("../partition_table.csv"));
        assert_eq!(config.target_triple, "xtensa-esp32-espidf");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.quit_grace, Duration::from_secs(1));
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_from_home_var() {
        let config = RunnerConfig::from_home_var(Some(OsString::from("/home/ci"))).unwrap();
        assert_eq!(
            config.emulator,
            PathBuf::from("/home/ci/qemu-xtensa/bin/qemu-system-xtensa")
        );
    }

    #[test]
    fn test_missing_home() {
        let result = RunnerConfig::from_home_var(None);
        assert!(matches!(result, Err(RunnerError::MissingHome)));
    }
}
