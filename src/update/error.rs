//! Typed failures for the self-update subsystem.
//!
//! Every component returns [`UpdateError`] rather than an opaque error so
//! the orchestrator can pattern-match on the failure kind when deciding
//! whether a rollback is required. The CLI boundary converts these into
//! `anyhow` errors with user-facing context.

use std::path::PathBuf;
use thiserror::Error;

/// All failure modes of the self-update pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A version string did not parse as `vMAJOR.MINOR.PATCH` or `dev`.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The offending version string.
        version: String,
        /// Which component failed, or what shape was wrong.
        reason: String,
    },

    /// A network transfer failed at the transport level.
    #[error("network error during {operation}")]
    Network {
        /// What was being transferred (e.g. "release lookup").
        operation: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A network transfer exceeded the caller's timeout budget.
    #[error("timed out during {operation}")]
    Timeout {
        /// What was being transferred.
        operation: String,
    },

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// No release artifact is published for this version/platform pair.
    ///
    /// This is the actionable 404: the caller can fall back to "latest"
    /// or report the platform as unsupported.
    #[error("no release artifact for version {version} on {platform}")]
    AssetNotFound {
        /// The requested version tag.
        version: String,
        /// The platform identifier (`<os>-<arch>`).
        platform: String,
    },

    /// The release feed returned a body that did not decode.
    #[error("failed to decode release metadata: {reason}")]
    ReleaseDecode {
        /// Decoder error detail.
        reason: String,
    },

    /// The checksum manifest has no entry for the downloaded artifact.
    #[error("no checksum entry for '{file}' in manifest")]
    ChecksumMissing {
        /// The artifact filename that was looked up.
        file: String,
    },

    /// The downloaded artifact does not match its published digest.
    #[error("checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The artifact filename.
        file: String,
        /// Digest from the manifest.
        expected: String,
        /// Digest computed over the downloaded bytes.
        actual: String,
    },

    /// An archive entry declares a size above the decompression ceiling.
    #[error("archive entry '{path}' declares {size} bytes, above the {limit} byte limit")]
    EntryTooLarge {
        /// Entry path as recorded in the archive.
        path: String,
        /// Declared entry size.
        size: u64,
        /// The enforced ceiling.
        limit: u64,
    },

    /// The archive stream ended without the expected binary entry.
    #[error("binary '{name}' not found in archive")]
    BinaryNotFound {
        /// The platform-specific binary filename that was expected.
        name: String,
    },

    /// The archive itself failed to decompress or parse.
    #[error("failed to read archive: {reason}")]
    ArchiveRead {
        /// Decoder error detail.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("failed to {operation} {}", .path.display())]
    Io {
        /// What was being done (e.g. "back up", "stage").
        operation: String,
        /// The path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A target or backup path failed the pre-mutation security check.
    #[error("refusing to touch {}: {reason}", .path.display())]
    PathDenied {
        /// The rejected path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The freshly installed binary failed the post-install sanity check.
    #[error("installed binary at {} is not executable", .path.display())]
    NotExecutable {
        /// The installed path.
        path: PathBuf,
    },

    /// Restoring the backup failed after a post-backup step went wrong.
    ///
    /// This is the one loud error the orchestrator propagates directly:
    /// it implies the installation may be broken and the backup is the
    /// only remaining copy of the previous binary.
    #[error("ROLLBACK FAILED for {}: {reason} - the previous binary may need manual restore", .path.display())]
    RollbackFailed {
        /// The installation path that could not be restored.
        path: PathBuf,
        /// Why the restore failed.
        reason: String,
    },
}

impl UpdateError {
    /// Helper for wrapping an I/O error with its operation and path.
    pub(crate) fn io(operation: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.to_string(),
            path: path.into(),
            source,
        }
    }
}
