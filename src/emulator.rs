//! QEMU process management.
//!
//! The emulator runs with `-nographic`, so its serial console is multiplexed
//! with the QEMU monitor on stdio. Console output is read from the child's
//! stdout; keystrokes (including the monitor escape) go to its stdin.

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use log::{debug, info};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

/// Ctrl-A, Ctrl-Q, then `c` (switch to monitor) and `q` (quit).
pub const QUIT_SEQUENCE: &[u8] = &[0x01, 0x11, b'c', b'q'];

/// Poll interval while waiting for the emulator to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Ask the emulator to drop into its monitor and quit.
///
/// Writes [`QUIT_SEQUENCE`] to the emulator console and flushes it.
pub fn request_monitor_quit<W: Write>(console: &mut W) -> io::Result<()> {
    console.write_all(QUIT_SEQUENCE)?;
    console.flush()
}

/// Command-line arguments for booting `image` on the given chip.
///
/// QEMU splits `-drive` options on commas, so image paths containing a comma
/// (or that are not valid UTF-8) are rejected.
pub fn emulator_args(chip: &str, image: &Path) -> Result<Vec<OsString>> {
    let image_str = match image.to_str() {
        Some(s) if !s.contains(',') => s,
        _ => {
            return Err(RunnerError::InvalidPath {
                path: image.to_path_buf(),
            })
        }
    };

    Ok(vec![
        "-nographic".into(),
        "-machine".into(),
        chip.into(),
        "-drive".into(),
        format!("file={},if=mtd,format=raw", image_str).into(),
    ])
}

/// A running emulator.
///
/// Dropping it kills and reaps the process if it is still running.
pub struct Emulator {
    child: Child,
    stdin: Option<ChildStdin>,
    program: String,
    reaped: bool,
}

impl Emulator {
    /// Boot `image` in the emulator.
    ///
    /// Returns the emulator together with its console output stream.
    pub fn spawn(config: &RunnerConfig, image: &Path) -> Result<(Self, ChildStdout)> {
        let program = config.emulator.display().to_string();
        let args = emulator_args(&config.chip, image)?;

        info!("Running {} in emulator", image.display());
        debug!("{} {:?}", program, args);

        let mut child = Command::new(&config.emulator)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Take the pipes before wrapping, so an early return still reaps the child
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let emulator = Self {
            child,
            stdin,
            program,
            reaped: false,
        };

        let stdout = stdout.ok_or_else(|| RunnerError::NoStdio {
            program: emulator.program.clone(),
        })?;
        if emulator.stdin.is_none() {
            return Err(RunnerError::NoStdio {
                program: emulator.program.clone(),
            });
        }

        Ok((emulator, stdout))
    }

    /// Send the monitor quit sequence to the emulator console.
    ///
    /// An emulator that already exited is not an error.
    pub fn request_quit(&mut self) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };
        match request_monitor_quit(stdin) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("{} closed its console before quit request", self.program);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wait up to `grace` for the emulator to exit, then kill it.
    pub fn shutdown(mut self, grace: Duration) -> Result<()> {
        self.stdin.take();

        let deadline = Instant::now() + grace;
        loop {
            if let Some(status) = self.child.try_wait()? {
                debug!("{} exited with {}", self.program, status);
                self.reaped = true;
                return Ok(());
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }

        // QEMU often ignores the quit request once the firmware has finished
        debug!(
            "{} still running {:?} after quit request, killing it",
            self.program, grace
        );
        let _ = self.child.kill();
        self.child.wait()?;
        self.reaped = true;
        Ok(())
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
