//! Instance mode: run one test binary in the emulator.

use crate::config::RunnerConfig;
use crate::emulator::Emulator;
use crate::error::Result;
use crate::image::FlashImage;
use crate::monitor::{self, Outcome};
use log::info;
use std::io::Write;
use std::path::Path;

/// Run `binary` in the emulator, mirroring its console to stdout.
///
/// Returns `Ok(true)` if the tests passed and `Ok(false)` if the firmware
/// aborted. Toolchain problems (image merge failed, emulator missing, hung
/// or exited early) are errors. The temporary flash image is removed on
/// every path once it has been created.
pub fn run_instance(config: &RunnerConfig, binary: &Path) -> Result<bool> {
    let stdout = std::io::stdout();
    let mut echo = stdout.lock();
    run_instance_with_output(config, binary, &mut echo)
}

/// Like [`run_instance`], mirroring the console to `echo` instead of stdout.
pub fn run_instance_with_output<W: Write>(
    config: &RunnerConfig,
    binary: &Path,
    echo: &mut W,
) -> Result<bool> {
    let image = FlashImage::create(config, binary)?;
    // On error the image is dropped, which removes it
    let outcome = boot_image(config, &image, echo)?;
    image.close()?;

    info!(
        "{}: {}",
        binary.display(),
        if outcome.passed() { "passed" } else { "FAILED" }
    );
    Ok(outcome.passed())
}

fn boot_image<W: Write>(config: &RunnerConfig, image: &FlashImage, echo: &mut W) -> Result<Outcome> {
    let (mut emulator, console) = Emulator::spawn(config, image.path())?;
    let outcome = monitor::wait_for_outcome(console, echo, config.timeout)?;

    emulator.request_quit()?;
    emulator.shutdown(config.quit_grace)?;
    Ok(outcome)
}
