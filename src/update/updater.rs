//! The update orchestrator: one check-and-apply operation.
//!
//! `SelfUpdater` sequences the release lookup, version comparison,
//! artifact download, checksum verification, archive extraction, and
//! binary swap into a single operation with defined failure and rollback
//! semantics:
//!
//! ```text
//! Idle -> CheckingVersion -> UpToDate
//!                         -> Downloading -> Verifying -> Extracting
//!                            -> BackingUp -> Installing -> Validating
//!                               -> Done
//!                               -> RollingBack -> RolledBack
//! ```
//!
//! Failures strictly before the backup step never touch the filesystem
//! and need no rollback. Failures at or after installation restore the
//! backup. Every attempt terminates in an [`UpdateOutcome`]; the one
//! error propagated directly is a failed rollback, which implies a
//! potentially broken installation and must not be swallowed.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::update::archive::extract_binary;
use crate::update::artifact::{ArtifactClient, find_checksum, verify_sha256};
use crate::update::error::UpdateError;
use crate::update::lock::InstallLock;
use crate::update::release::{ReleaseClient, ReleaseInfo};
use crate::update::swap::BinarySwapper;
use crate::update::version::{self, VersionComparison};
use crate::utils::platform::Platform;

/// Caller-supplied configuration for one update attempt.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Version to install, or `None` for the latest published release.
    pub target_version: Option<String>,
    /// Proceed even when the target is not strictly newer (reinstall or
    /// downgrade).
    pub allow_downgrade: bool,
    /// Verify the artifact against the release checksum manifest.
    pub verify_checksum: bool,
    /// Keep the backup file after a successful install instead of
    /// deleting it.
    pub keep_backup: bool,
    /// Budget for each network transfer in the operation.
    pub timeout: Duration,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            target_version: None,
            allow_downgrade: false,
            verify_checksum: true,
            keep_backup: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Terminal description of one update attempt.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Version that was running when the attempt started.
    pub previous_version: String,
    /// Version that is installed now (equals `previous_version` when no
    /// install happened).
    pub new_version: String,
    /// Whether the attempt ended in its success terminal state.
    pub succeeded: bool,
    /// Location of the backup file, when one remains on disk.
    pub backup_path: Option<PathBuf>,
    /// Failure description for unsuccessful attempts.
    pub error_detail: Option<String>,
}

impl UpdateOutcome {
    /// Whether a new binary was actually installed.
    #[must_use]
    pub fn updated(&self) -> bool {
        self.succeeded && self.previous_version != self.new_version
    }
}

/// Orchestrates self-update for the running binary.
///
/// Repository identity and the current version default to this build's
/// release configuration; tests override them along with the API hosts
/// and the install path.
pub struct SelfUpdater {
    repo_owner: String,
    repo_name: String,
    bin_name: String,
    current_version: String,
    api_base: Option<String>,
    releases_base: Option<String>,
    install_path: Option<PathBuf>,
}

impl Default for SelfUpdater {
    fn default() -> Self {
        Self {
            repo_owner: "biwakonbu".to_string(),
            repo_name: "reviewtask".to_string(),
            bin_name: "reviewtask".to_string(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            api_base: None,
            releases_base: None,
            install_path: None,
        }
    }
}

impl SelfUpdater {
    /// Create an updater with the default repository configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the version the running binary reports.
    #[must_use]
    pub fn with_current_version(mut self, version: &str) -> Self {
        self.current_version = version.to_string();
        self
    }

    /// Override the install target instead of resolving the running
    /// executable. Used by tests and by explicit install locations.
    #[must_use]
    pub fn with_install_path(mut self, path: PathBuf) -> Self {
        self.install_path = Some(path);
        self
    }

    /// Override the release feed host. Used by tests.
    #[must_use]
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = Some(base.to_string());
        self
    }

    /// Override the artifact download host. Used by tests.
    #[must_use]
    pub fn with_releases_base(mut self, base: &str) -> Self {
        self.releases_base = Some(base.to_string());
        self
    }

    /// The version of the running binary.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Check whether a strictly newer release is published.
    ///
    /// Returns the release metadata when an update is available, `None`
    /// when the local version is current or ahead (including `dev`
    /// builds, which never report as outdated).
    ///
    /// # Errors
    ///
    /// Propagates feed and version-parse failures; nothing is downloaded
    /// or mutated.
    pub async fn check_for_update(
        &self,
        timeout: Duration,
    ) -> Result<Option<ReleaseInfo>, UpdateError> {
        let release = self.release_client(timeout)?.latest().await?;
        match version::compare_str(&self.current_version, &release.tag)? {
            VersionComparison::Older => Ok(Some(release)),
            _ => {
                debug!("Local version {} is current or ahead", self.current_version);
                Ok(None)
            }
        }
    }

    /// Fetch the latest published release without comparing versions.
    ///
    /// # Errors
    ///
    /// Propagates feed failures; nothing is downloaded or mutated.
    pub async fn latest_release(&self, timeout: Duration) -> Result<ReleaseInfo, UpdateError> {
        self.release_client(timeout)?.latest().await
    }

    /// Run one complete check-and-apply operation.
    ///
    /// Always terminates in an [`UpdateOutcome`]; failures before any
    /// filesystem mutation and failures that were rolled back cleanly
    /// are reported inside the outcome.
    ///
    /// # Errors
    ///
    /// The single hard error is [`UpdateError::RollbackFailed`]: a
    /// post-install failure whose backup restore also failed, leaving a
    /// potentially broken installation.
    pub async fn run(&self, request: &UpdateRequest) -> Result<UpdateOutcome, UpdateError> {
        match self.try_run(request).await {
            Ok(outcome) => Ok(outcome),
            Err(e @ UpdateError::RollbackFailed { .. }) => Err(e),
            Err(e) => {
                warn!("Update failed before any filesystem change: {e}");
                Ok(UpdateOutcome {
                    previous_version: self.current_version.clone(),
                    new_version: self.current_version.clone(),
                    succeeded: false,
                    backup_path: None,
                    error_detail: Some(e.to_string()),
                })
            }
        }
    }

    async fn try_run(&self, request: &UpdateRequest) -> Result<UpdateOutcome, UpdateError> {
        let platform = Platform::current();

        // CheckingVersion
        let target_tag = match &request.target_version {
            Some(version) => version.clone(),
            None => self.release_client(request.timeout)?.latest().await?.tag,
        };
        let target_display = target_tag.trim_start_matches('v').to_string();

        let comparison = version::compare_str(&self.current_version, &target_tag)?;
        if comparison != VersionComparison::Older && !request.allow_downgrade {
            // UpToDate: terminal success, no bytes fetched.
            info!(
                "Already on {} (target {target_display}), nothing to do",
                self.current_version
            );
            return Ok(UpdateOutcome {
                previous_version: self.current_version.clone(),
                new_version: self.current_version.clone(),
                succeeded: true,
                backup_path: None,
                error_detail: None,
            });
        }

        let swapper = BinarySwapper::new(self.resolve_install_path()?)?;
        let _lock = InstallLock::acquire(swapper.target_path()).await?;

        // Downloading: the artifact and the checksum manifest are
        // independent transfers; both must complete before verification.
        info!(
            "Updating {} -> {target_display} ({platform})",
            self.current_version
        );
        let artifacts = self.artifact_client(request.timeout)?;
        let (archive_bytes, manifest) = tokio::try_join!(
            artifacts.download_asset(&target_tag, platform),
            async {
                if request.verify_checksum {
                    artifacts.download_checksums(&target_tag).await.map(Some)
                } else {
                    Ok(None)
                }
            }
        )?;

        // Verifying (skipped when the request disabled checksums)
        if let Some(manifest) = &manifest {
            let filename = artifacts.asset_filename(&target_tag, platform);
            let digest =
                find_checksum(manifest, &filename).ok_or_else(|| UpdateError::ChecksumMissing {
                    file: filename.clone(),
                })?;
            verify_sha256(&archive_bytes, digest, &filename)?;
        } else {
            debug!("Checksum verification disabled by request");
        }

        // Extracting
        let binary = extract_binary(&archive_bytes, platform, &self.bin_name)?;

        // BackingUp: a failure here aborts before any destructive step.
        swapper.backup().await?;

        // Installing -> Validating, with rollback on failure.
        let install_result = match swapper.install(binary).await {
            Ok(()) => swapper.validate(),
            Err(e) => Err(e),
        };

        if let Err(cause) = install_result {
            warn!("Install failed ({cause}), rolling back");
            if let Err(restore_err) = swapper.restore().await {
                return Err(UpdateError::RollbackFailed {
                    path: swapper.target_path().to_path_buf(),
                    reason: format!("{cause}; restore also failed: {restore_err}"),
                });
            }
            // RolledBack: filesystem is in its pre-update state.
            return Ok(UpdateOutcome {
                previous_version: self.current_version.clone(),
                new_version: self.current_version.clone(),
                succeeded: false,
                backup_path: Some(swapper.backup_path().to_path_buf()),
                error_detail: Some(cause.to_string()),
            });
        }

        // Done
        let backup_path = if request.keep_backup {
            Some(swapper.backup_path().to_path_buf())
        } else {
            if let Err(e) = swapper.cleanup_backup().await {
                debug!("Failed to remove backup: {e}");
            }
            None
        };

        info!("Updated {} -> {target_display}", self.current_version);
        Ok(UpdateOutcome {
            previous_version: self.current_version.clone(),
            new_version: target_display,
            succeeded: true,
            backup_path,
            error_detail: None,
        })
    }

    /// Restore the previous binary from its backup file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when no backup exists or the restore
    /// write fails.
    pub async fn rollback(&self) -> Result<PathBuf, UpdateError> {
        let swapper = BinarySwapper::new(self.resolve_install_path()?)?;
        let _lock = InstallLock::acquire(swapper.target_path()).await?;
        swapper.restore().await?;
        Ok(swapper.target_path().to_path_buf())
    }

    /// Whether a backup file exists for the current install target.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the running executable path
    /// cannot be resolved.
    pub fn backup_available(&self) -> Result<bool, UpdateError> {
        Ok(BinarySwapper::new(self.resolve_install_path()?)?.backup_exists())
    }

    /// The install target: an explicit override, or the running
    /// executable's symlink-resolved path.
    fn resolve_install_path(&self) -> Result<PathBuf, UpdateError> {
        if let Some(path) = &self.install_path {
            return Ok(path.clone());
        }
        let exe = std::env::current_exe()
            .map_err(|e| UpdateError::io("resolve running executable", "<current-exe>", e))?;
        exe.canonicalize().map_err(|e| UpdateError::io("canonicalize", exe.clone(), e))
    }

    fn release_client(&self, timeout: Duration) -> Result<ReleaseClient, UpdateError> {
        let client = ReleaseClient::new(&self.repo_owner, &self.repo_name, timeout)?;
        Ok(match &self.api_base {
            Some(base) => client.with_api_base(base),
            None => client,
        })
    }

    fn artifact_client(&self, timeout: Duration) -> Result<ArtifactClient, UpdateError> {
        let client = ArtifactClient::new(&self.repo_owner, &self.repo_name, timeout)?;
        Ok(match &self.releases_base {
            Some(base) => client.with_releases_base(base),
            None => client,
        })
    }
}
