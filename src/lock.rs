//! Single-run lock
//!
//! A scrape run holds an exclusive advisory lock on the lock file for its
//! whole duration. The lock belongs to the open handle, so the operating
//! system releases it when the process exits for any reason, including a
//! kill or a panic. A lock file left on disk by a dead run therefore never
//! blocks the next one; only a live holder does.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Held run lock, released when dropped or when the process dies
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Tries to take the lock at `path`
    ///
    /// The file is created if missing and is left in place afterwards; its
    /// content is the pid of the last holder.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(RunLock))` - The lock was taken
    /// * `Ok(None)` - A live run holds the lock
    /// * `Err(io::Error)` - The lock file could not be opened or locked
    pub fn acquire(path: &Path) -> io::Result<Option<Self>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Ok(None),
            Err(e) => return Err(e),
        }

        // The pid is informational; a write failure keeps the lock
        let _ = file
            .set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()));

        tracing::debug!("Acquired run lock {}", path.display());
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}

/// Whether a live run currently holds the lock at `path`
///
/// Tries the lock and releases it right away. A missing or
/// unlocked file means no run is in progress.
pub fn is_run_in_progress(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };

    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(e) if is_contended(&e) => true,
        Err(e) => {
            tracing::debug!("Cannot test run lock {}: {}", path.display(), e);
            false
        }
    }
}

fn is_contended(error: &io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    match (error.raw_os_error(), contended.raw_os_error()) {
        (Some(code), Some(expected)) => code == expected,
        _ => error.kind() == contended.kind(),
    }
}
