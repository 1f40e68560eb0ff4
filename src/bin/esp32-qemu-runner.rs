//! Cargo runner for ESP32 tests in QEMU.
//!
//! Usage:
//!   esp32-qemu-runner            # run `cargo test` with this runner
//!   esp32-qemu-runner <BINARY>   # run one test binary (called by cargo)

use clap::Parser;
use esp32_qemu_runner::exit::EXIT_RUNNER_ERROR;
use esp32_qemu_runner::{
    instance_exit_code, invoker_exit_code, run_instance, run_invoker, RunnerConfig, RunnerError,
};
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Run ESP32 unit test binaries in QEMU",
    long_about = "Run ESP32 unit test binaries in QEMU.\n\n\
        Without arguments, runs `cargo test` with this program registered as the \
        runner for xtensa-esp32-espidf. With a test binary, merges it into a flash \
        image, boots it in QEMU and exits 0 if the tests passed, 1 if they failed."
)]
struct Cli {
    /// Test binary to run. Leave unspecified to act as the main runner.
    binary: Option<PathBuf>,

    /// Arguments cargo forwards to the test binary (ignored).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    test_args: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_RUNNER_ERROR);
        }
    };

    match cli.binary {
        Some(binary) => {
            if !cli.test_args.is_empty() {
                debug!("Ignoring test arguments: {:?}", cli.test_args);
            }
            instance(&config, binary)
        }
        None => invoker(&config),
    }
}

fn instance(config: &RunnerConfig, binary: PathBuf) -> ExitCode {
    let result = run_instance(config, &binary);
    if let Err(e) = &result {
        error!("{}: {}", binary.display(), e);
    }
    ExitCode::from(instance_exit_code(&result))
}

fn invoker(config: &RunnerConfig) -> ExitCode {
    let result = std::env::current_exe()
        .map_err(RunnerError::from)
        .and_then(|runner| run_invoker(config, &runner));

    // run_invoker already logged cargo's failure
    if let Err(e) = &result {
        if !matches!(e, RunnerError::ToolFailed { .. }) {
            error!("{}", e);
        }
    }
    ExitCode::from(invoker_exit_code(&result))
}
