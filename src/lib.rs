//! Run ESP32 unit test binaries in QEMU.
//!
//! Registered as the cargo runner for `xtensa-esp32-espidf`, each test binary
//! is merged into a flash image with espflash, booted in the ESP32 QEMU
//! machine and classified by the ESP-IDF console output:
//! `Returned from app_main()` means the tests passed, `abort() was called at
//! PC` means one of them panicked.

pub mod config;
pub mod emulator;
pub mod error;
pub mod exit;
pub mod image;
pub mod instance;
pub mod invoker;
pub mod monitor;

#[cfg(all(test, unix))]
mod testutil;

pub use config::RunnerConfig;
pub use error::{Result, RunnerError};
pub use exit::{instance_exit_code, invoker_exit_code};
pub use instance::{run_instance, run_instance_with_output};
pub use invoker::run_invoker;
pub use monitor::Outcome;
