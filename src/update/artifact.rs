//! Release artifact and checksum manifest retrieval.
//!
//! URL construction is pure string templating so it can be unit-tested
//! without a network. Downloads honor the caller's timeout budget and
//! report a missing artifact (HTTP 404) as a distinct, actionable error
//! instead of a generic transport failure.

use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use crate::update::error::UpdateError;
use crate::update::release::classify_transport;
use crate::utils::platform::Platform;
use crate::utils::progress;

/// Filename of the plain-text checksum manifest attached to each release.
pub const CHECKSUM_MANIFEST: &str = "checksums.txt";

/// Downloads release artifacts and checksum manifests for one project.
pub struct ArtifactClient {
    http: reqwest::Client,
    releases_base: String,
    owner: String,
    repo: String,
    timeout: Duration,
}

impl ArtifactClient {
    /// Create a client for `owner/repo` with the given network budget.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Network`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(owner: &str, repo: &str, timeout: Duration) -> Result<Self, UpdateError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("reviewtask/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Network {
                operation: "HTTP client setup".to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            releases_base: "https://github.com".to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            timeout,
        })
    }

    /// Override the download host. Used by tests to point at a local fixture.
    #[must_use]
    pub fn with_releases_base(mut self, base: &str) -> Self {
        self.releases_base = base.trim_end_matches('/').to_string();
        self
    }

    /// The artifact filename for a version/platform pair.
    ///
    /// The `v` prefix on `version` is normalized, so `1.2.3` and `v1.2.3`
    /// produce identical names.
    #[must_use]
    pub fn asset_filename(&self, version: &str, platform: Platform) -> String {
        let version = version.trim_start_matches('v');
        format!("{}-v{}-{}.tar.gz", self.repo, version, platform)
    }

    /// The download URL for the artifact of a version/platform pair.
    #[must_use]
    pub fn asset_url(&self, version: &str, platform: Platform) -> String {
        let version = version.trim_start_matches('v');
        format!(
            "{}/{}/{}/releases/download/v{}/{}",
            self.releases_base,
            self.owner,
            self.repo,
            version,
            self.asset_filename(version, platform)
        )
    }

    /// The download URL for a version's checksum manifest.
    #[must_use]
    pub fn checksum_url(&self, version: &str) -> String {
        let version = version.trim_start_matches('v');
        format!(
            "{}/{}/{}/releases/download/v{}/{CHECKSUM_MANIFEST}",
            self.releases_base, self.owner, self.repo, version
        )
    }

    /// Download the release artifact for a version/platform pair.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::AssetNotFound`] when the server answers 404 (no
    ///   artifact published for this version/platform pair)
    /// - [`UpdateError::Timeout`] / [`UpdateError::Network`] /
    ///   [`UpdateError::HttpStatus`] for other transfer failures
    pub async fn download_asset(
        &self,
        version: &str,
        platform: Platform,
    ) -> Result<Vec<u8>, UpdateError> {
        let url = self.asset_url(version, platform);
        info!("Downloading {url}");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_transport("artifact download", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UpdateError::AssetNotFound {
                version: version.trim_start_matches('v').to_string(),
                platform: platform.to_string(),
            });
        }
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let bar = progress::download_bar(response.content_length());
        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_transport("artifact download", e))?
        {
            bytes.extend_from_slice(&chunk);
            bar.inc(chunk.len() as u64);
        }
        bar.finish_and_clear();

        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Download a version's checksum manifest as text.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::download_asset`], except a 404 is an
    /// [`UpdateError::HttpStatus`] since a missing manifest is not a
    /// per-platform condition.
    pub async fn download_checksums(&self, version: &str) -> Result<String, UpdateError> {
        let url = self.checksum_url(version);
        debug!("Fetching checksum manifest from {url}");

        let response = self
            .http
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_transport("checksum manifest download", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport("checksum manifest download", e))
    }
}

/// Look up the digest for `filename` in a checksum manifest.
///
/// The manifest is plain text, one `<hex-digest><whitespace><filename>`
/// record per line; the filename field may be a path containing the
/// target name. The first line whose filename field contains `filename`
/// as a substring wins; exact matching is deliberately not required so
/// manifests that list files under a subdirectory still resolve.
#[must_use]
pub fn find_checksum<'a>(manifest: &'a str, filename: &str) -> Option<&'a str> {
    for line in manifest.lines() {
        let line = line.trim();
        let Some((digest, name_field)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if name_field.trim_start().contains(filename) {
            return Some(digest);
        }
    }
    None
}

/// Verify that `bytes` hash to `expected` (hex SHA-256, case-insensitive).
///
/// # Errors
///
/// Returns [`UpdateError::ChecksumMismatch`] carrying both digests.
pub fn verify_sha256(bytes: &[u8], expected: &str, filename: &str) -> Result<(), UpdateError> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let actual = hex::encode(hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected) {
        return Err(UpdateError::ChecksumMismatch {
            file: filename.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    info!("Checksum verified for {filename}");
    Ok(())
}
