//! Safe extraction of the release binary from a gzip tar archive.
//!
//! The extractor is a pure transformation: archive bytes in, binary bytes
//! or error out, with no filesystem access. Two invariants hold for every
//! entry before any of its content is read into memory:
//!
//! - entries whose path is absolute or contains a parent-directory
//!   segment are skipped outright and never treated as a match, so a
//!   crafted archive cannot steer the install outside its destination
//! - entries whose declared size exceeds [`MAX_ENTRY_SIZE`] abort the
//!   extraction, so a decompression bomb cannot exhaust memory

use flate2::read::GzDecoder;
use std::io::Read;
use tar::Archive;
use tracing::{debug, warn};

use crate::update::error::UpdateError;
use crate::utils::platform::Platform;
use crate::utils::security::has_traversal;

/// Ceiling on the declared size of any single archive entry (100 MiB).
pub const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

/// Scan a gzip tar archive for the platform-specific binary entry.
///
/// The entry may live at any depth; it matches when its base filename
/// equals `tool` (with `.exe` appended on Windows targets).
///
/// # Errors
///
/// - [`UpdateError::EntryTooLarge`] if any entry declares a size above
///   the ceiling
/// - [`UpdateError::BinaryNotFound`] if the stream ends without a match
/// - [`UpdateError::ArchiveRead`] if the stream is not a valid gzip tar
pub fn extract_binary(
    archive: &[u8],
    platform: Platform,
    tool: &str,
) -> Result<Vec<u8>, UpdateError> {
    let expected = platform.binary_name(tool);
    let mut tar = Archive::new(GzDecoder::new(archive));

    let entries = tar.entries().map_err(|e| UpdateError::ArchiveRead {
        reason: e.to_string(),
    })?;

    for entry in entries {
        let mut entry = entry.map_err(|e| UpdateError::ArchiveRead {
            reason: e.to_string(),
        })?;

        let path = entry
            .path()
            .map_err(|e| UpdateError::ArchiveRead {
                reason: e.to_string(),
            })?
            .into_owned();

        // Never extract or match entries that could escape the destination.
        if path.has_root() || has_traversal(&path) {
            warn!("Skipping unsafe archive entry {}", path.display());
            continue;
        }

        let size = entry.header().size().map_err(|e| UpdateError::ArchiveRead {
            reason: e.to_string(),
        })?;
        if size > MAX_ENTRY_SIZE {
            return Err(UpdateError::EntryTooLarge {
                path: path.display().to_string(),
                size,
                limit: MAX_ENTRY_SIZE,
            });
        }

        if !entry.header().entry_type().is_file() {
            continue;
        }

        if path.file_name() == Some(std::ffi::OsStr::new(&expected)) {
            debug!("Found binary entry {} ({size} bytes)", path.display());
            let mut bytes = Vec::with_capacity(size as usize);
            entry.read_to_end(&mut bytes).map_err(|e| UpdateError::ArchiveRead {
                reason: e.to_string(),
            })?;
            return Ok(bytes);
        }
    }

    Err(UpdateError::BinaryNotFound { name: expected })
}
