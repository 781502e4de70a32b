//! Backup, atomic install, and rollback of the running executable.
//!
//! The swapper owns the only filesystem mutations in the update pipeline.
//! Every path is validated before any read or write: traversal segments
//! and protected system directories are rejected outright. Installation
//! stages the new binary in a temporary file created in the target's own
//! directory, so the final rename is atomic on the local filesystem; the
//! rename is the single point of no return.

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::update::error::UpdateError;
use crate::utils::platform::is_executable;
use crate::utils::security::validate_install_path;

/// Manages the target executable, its sibling backup, and the staged
/// replacement during an update.
pub struct BinarySwapper {
    target_path: PathBuf,
    backup_path: PathBuf,
}

impl BinarySwapper {
    /// Create a swapper for the given installation path.
    ///
    /// The backup location is `<target>.backup` in the same directory.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::PathDenied`] when the target path contains
    /// a traversal segment, targets a protected system directory, or has
    /// no parent directory to stage into.
    pub fn new(target_path: PathBuf) -> Result<Self, UpdateError> {
        if let Err(reason) = validate_install_path(&target_path) {
            return Err(UpdateError::PathDenied {
                path: target_path,
                reason,
            });
        }
        if target_path.parent().is_none_or(|p| p.as_os_str().is_empty()) {
            return Err(UpdateError::PathDenied {
                path: target_path,
                reason: "path has no parent directory to stage into".to_string(),
            });
        }

        let mut backup_path = target_path.clone();
        backup_path.set_file_name(format!(
            "{}.backup",
            target_path.file_name().unwrap_or_default().to_string_lossy()
        ));

        Ok(Self {
            target_path,
            backup_path,
        })
    }

    /// The installation path being managed.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// The sibling backup path.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Whether a backup file currently exists on disk.
    #[must_use]
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Copy the current executable to the backup location.
    ///
    /// The full file is read into memory and written out with the
    /// original permission bits, so the backup is a standalone executable
    /// copy. Failure here aborts the update before any destructive step.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the target cannot be read or the
    /// backup cannot be written.
    pub async fn backup(&self) -> Result<(), UpdateError> {
        let bytes = fs::read(&self.target_path)
            .await
            .map_err(|e| UpdateError::io("read for backup", &self.target_path, e))?;

        info!("Backing up {} -> {}", self.target_path.display(), self.backup_path.display());
        fs::write(&self.backup_path, &bytes)
            .await
            .map_err(|e| UpdateError::io("write backup", &self.backup_path, e))?;

        #[cfg(unix)]
        {
            let metadata = fs::metadata(&self.target_path)
                .await
                .map_err(|e| UpdateError::io("read metadata of", &self.target_path, e))?;
            fs::set_permissions(&self.backup_path, metadata.permissions())
                .await
                .map_err(|e| UpdateError::io("set permissions on", &self.backup_path, e))?;
        }

        Ok(())
    }

    /// Atomically install new binary bytes over the target path.
    ///
    /// Stages into a temp file in the target's directory, sets executable
    /// permission bits, then renames onto the target. If anything fails
    /// before the rename, the temp file is removed and the target is left
    /// byte-for-byte untouched.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] for staging or rename failures.
    pub async fn install(&self, bytes: Vec<u8>) -> Result<(), UpdateError> {
        let target = self.target_path.clone();
        tokio::task::spawn_blocking(move || {
            let staged = stage_binary(&target, &bytes)?;
            commit_staged(staged, &target)
        })
        .await
        .map_err(|e| UpdateError::io("install", &self.target_path, std::io::Error::other(e)))?
    }

    /// Post-install sanity check: the installed path exists and carries
    /// execute permission. The binary is never actually executed.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::NotExecutable`] when the check fails.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if is_executable(&self.target_path) {
            debug!("Validated installed binary at {}", self.target_path.display());
            Ok(())
        } else {
            Err(UpdateError::NotExecutable {
                path: self.target_path.clone(),
            })
        }
    }

    /// Restore the backup over the target path.
    ///
    /// The inverse of [`Self::backup`]: reads the backup and writes it
    /// back with matching permissions. Retries a few times on Windows
    /// where the previous binary may still be locked by a lingering
    /// process handle.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when no backup exists or the write
    /// back fails after all attempts.
    pub async fn restore(&self) -> Result<(), UpdateError> {
        if !self.backup_exists() {
            return Err(UpdateError::io(
                "restore from",
                &self.backup_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no backup file"),
            ));
        }

        warn!("Restoring {} from {}", self.target_path.display(), self.backup_path.display());

        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 0;
        loop {
            match self.attempt_restore().await {
                Ok(()) => {
                    info!("Restored previous binary");
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS - 1 => {
                    warn!("Restore attempt {} failed: {e}, retrying", attempt + 1);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt_restore(&self) -> Result<(), UpdateError> {
        let bytes = fs::read(&self.backup_path)
            .await
            .map_err(|e| UpdateError::io("read backup", &self.backup_path, e))?;

        fs::write(&self.target_path, &bytes)
            .await
            .map_err(|e| UpdateError::io("restore", &self.target_path, e))?;

        #[cfg(unix)]
        {
            let metadata = fs::metadata(&self.backup_path)
                .await
                .map_err(|e| UpdateError::io("read metadata of", &self.backup_path, e))?;
            fs::set_permissions(&self.target_path, metadata.permissions())
                .await
                .map_err(|e| UpdateError::io("set permissions on", &self.target_path, e))?;
        }

        Ok(())
    }

    /// Remove the backup file if present. Safe to call unconditionally
    /// after a successful update.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the file exists but cannot be
    /// removed.
    pub async fn cleanup_backup(&self) -> Result<(), UpdateError> {
        if self.backup_exists() {
            debug!("Removing backup at {}", self.backup_path.display());
            fs::remove_file(&self.backup_path)
                .await
                .map_err(|e| UpdateError::io("remove backup", &self.backup_path, e))?;
        }
        Ok(())
    }
}

/// Write `bytes` to a temp file in the target's directory with executable
/// permission bits set. Dropping the returned handle removes the file, so
/// a failure anywhere before the rename leaves only the target behind.
fn stage_binary(target: &Path, bytes: &[u8]) -> Result<NamedTempFile, UpdateError> {
    use std::io::Write;

    let dir = target.parent().ok_or_else(|| UpdateError::PathDenied {
        path: target.to_path_buf(),
        reason: "path has no parent directory to stage into".to_string(),
    })?;

    let mut staged = tempfile::Builder::new()
        .prefix(".reviewtask-staged-")
        .tempfile_in(dir)
        .map_err(|e| UpdateError::io("create staging file in", dir, e))?;

    staged
        .write_all(bytes)
        .map_err(|e| UpdateError::io("write staged binary to", staged.path().to_path_buf(), e))?;
    staged
        .flush()
        .map_err(|e| UpdateError::io("flush staged binary at", staged.path().to_path_buf(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))
            .map_err(|e| {
                UpdateError::io("set permissions on", staged.path().to_path_buf(), e)
            })?;
    }

    Ok(staged)
}

/// Rename the staged file onto the target: the single point of no return.
fn commit_staged(staged: NamedTempFile, target: &Path) -> Result<(), UpdateError> {
    // Windows cannot rename over an existing executable; clearing the
    // target first narrows atomicity but is the platform's best option.
    #[cfg(windows)]
    if target.exists() {
        std::fs::remove_file(target)
            .map_err(|e| UpdateError::io("remove previous binary at", target, e))?;
    }

    staged
        .persist(target)
        .map_err(|e| UpdateError::io("rename staged binary onto", target, e.error))?;

    info!("Installed new binary at {}", target.display());
    Ok(())
}
