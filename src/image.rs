//! Flash image creation.
//!
//! `espflash save-image --merge` combines the test binary with bootloader and
//! partition table into a single image that QEMU can boot from its MTD drive.
//! The image lives in a temporary directory owned by [`FlashImage`] and is
//! deleted when the value is dropped.

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// File name of the merged image inside its temporary directory.
pub const IMAGE_FILE_NAME: &str = "test.qemu";

/// A merged flash image in a scoped temporary directory.
#[derive(Debug)]
pub struct FlashImage {
    // Dropping the TempDir removes the image
    dir: TempDir,
    path: PathBuf,
}

impl FlashImage {
    /// Merge `binary` into a flash image.
    ///
    /// Fails with [`RunnerError::ToolFailed`] if espflash exits non-zero; the
    /// temporary directory is removed in that case too.
    pub fn create(config: &RunnerConfig, binary: &Path) -> Result<Self> {
        let dir = match &config.scratch_dir {
            Some(parent) => tempfile::Builder::new()
                .prefix("qemu-image-")
                .tempdir_in(parent)?,
            None => tempfile::Builder::new().prefix("qemu-image-").tempdir()?,
        };
        let path = dir.path().join(IMAGE_FILE_NAME);

        info!("Creating flash image for {}", binary.display());
        let args = save_image_args(config, binary, &path);
        debug!("{} {:?}", config.merge_tool.display(), args);

        let status = Command::new(&config.merge_tool)
            .args(&args)
            .status()
            .map_err(|source| RunnerError::Spawn {
                program: config.merge_tool.display().to_string(),
                source,
            })?;

        if !status.success() {
            return Err(RunnerError::ToolFailed {
                tool: config.merge_tool.display().to_string(),
                status,
            });
        }

        Ok(Self { dir, path })
    }

    /// Path of the merged image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the image now, reporting any removal error.
    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}

/// Arguments for `espflash save-image`.
pub fn save_image_args(config: &RunnerConfig, binary: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "save-image".into(),
        "--merge".into(),
        "--chip".into(),
        config.chip.clone().into(),
        "--partition-table".into(),
        config.partition_table.clone().into(),
        binary.into(),
        output.into(),
    ]
}
