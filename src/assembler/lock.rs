//! Guard against two assembler runs racing on the same image and staging
//! paths.
//!
//! The lock file itself stays in `target/` between runs. Only the `flock`
//! on it matters, and it is released when the guard's handle closes.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const LOCK_FILENAME: &str = ".kboot-builder.lock";

/// Exclusive lock held for the duration of a run.
#[derive(Debug)]
pub struct RunLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock in `dir`, failing fast if another run holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating lock directory '{}'", dir.display()))?;
        let path = dir.join(LOCK_FILENAME);

        // The path must keep naming one inode, so it is never unlinked.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("opening lock file '{}'", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(anyhow::anyhow!(
                "another assembler run holds the lock at '{}'",
                path.display()
            ));
        }

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
