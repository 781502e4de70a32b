//! Advisory file locking for the installation path.
//!
//! Only one update operation may hold the backup/install sequence for a
//! given installation path at a time. The lock file lives alongside the
//! target binary and is released when the lock object drops.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::update::error::UpdateError;

/// An exclusive lock over one installation path.
pub struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Acquire an exclusive lock for the given install target.
    ///
    /// Creates `<target>.lock` next to the binary and takes an OS-level
    /// exclusive lock on it, blocking (off the async runtime) until any
    /// concurrent holder releases it.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the lock file cannot be created
    /// or locked.
    pub async fn acquire(target: &Path) -> Result<Self, UpdateError> {
        let mut lock_path = target.to_path_buf();
        lock_path.set_file_name(format!(
            "{}.lock",
            target.file_name().unwrap_or_default().to_string_lossy()
        ));

        debug!("Acquiring install lock at {}", lock_path.display());

        let path_for_task = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path_for_task)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| UpdateError::io("acquire lock at", lock_path.clone(), std::io::Error::other(e)))?
        .map_err(|e| UpdateError::io("acquire lock at", lock_path.clone(), e))?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self._file.unlock() {
            debug!("Failed to unlock {}: {e}", self.path.display());
        }
    }
}
