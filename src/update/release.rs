//! Release feed client for the GitHub releases API.
//!
//! A single read-only request against the `releases/latest` resource,
//! which GitHub already filters to the most recent published,
//! non-prerelease release. Each call is a fresh network round trip; there
//! is no caching and no retrying here (retry policy, if any, belongs to
//! the caller).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::update::error::UpdateError;

/// Immutable snapshot of a published release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Release tag (e.g. `v1.2.0`).
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Human-readable release title.
    #[serde(rename = "name", default)]
    pub title: String,
    /// Release notes body (markdown).
    #[serde(rename = "body", default)]
    pub notes: String,
    /// Whether the release is marked as a prerelease.
    #[serde(rename = "prerelease", default)]
    pub is_prerelease: bool,
    /// Publication timestamp.
    pub published_at: DateTime<Utc>,
    /// URL of the release page.
    #[serde(rename = "html_url")]
    pub page_url: String,
}

/// Client for the per-project "latest release" resource.
pub struct ReleaseClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    timeout: Duration,
}

impl ReleaseClient {
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
            api_base: "https://api.github.com".to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            timeout,
        })
    }

    /// Override the API host. Used by tests to point at a local fixture.
    #[must_use]
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    /// Fetch the latest published, non-prerelease release.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Timeout`] when the network budget is exceeded
    /// - [`UpdateError::Network`] for transport failures
    /// - [`UpdateError::HttpStatus`] for non-2xx responses
    /// - [`UpdateError::ReleaseDecode`] when the body does not decode
    pub async fn latest(&self) -> Result<ReleaseInfo, UpdateError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        );
        debug!("Fetching latest release from {url}");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_transport("release lookup", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport("release lookup", e))?;

        let release: ReleaseInfo =
            serde_json::from_str(&body).map_err(|e| UpdateError::ReleaseDecode {
                reason: e.to_string(),
            })?;

        debug!(tag = %release.tag, published = %release.published_at, "Latest release");
        Ok(release)
    }
}

/// Map a reqwest transport failure onto the update error taxonomy,
/// distinguishing timeouts from other transport errors.
pub(crate) fn classify_transport(operation: &str, error: reqwest::Error) -> UpdateError {
    if error.is_timeout() {
        UpdateError::Timeout {
            operation: operation.to_string(),
        }
    } else {
        UpdateError::Network {
            operation: operation.to_string(),
            source: error,
        }
    }
}
