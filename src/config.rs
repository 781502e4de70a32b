//! Global configuration for reviewtask.
//!
//! Loaded from `~/.reviewtask/config.toml` (overridable via the
//! `REVIEWTASK_CONFIG_PATH` environment variable). A missing file yields
//! defaults rather than an error. The caller uses the `[updates]` section
//! to decide *whether* to invoke the update subsystem; the decision
//! itself is the pure [`should_check`] predicate so it can be tested
//! without touching the clock or the filesystem.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Settings controlling automatic update checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Whether automatic update checks are enabled at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hours between automatic checks. `0` disables checking.
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,

    /// Whether prerelease versions should be surfaced in notifications.
    #[serde(default)]
    pub notify_prereleases: bool,

    /// When the feed was last queried, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            check_interval_hours: default_check_interval_hours(),
            notify_prereleases: false,
            last_checked_at: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// 24 hours keeps notifications daily while staying well inside the
/// unauthenticated GitHub API rate limit.
fn default_check_interval_hours() -> u64 {
    24
}

/// User-wide configuration, stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Automatic update check settings.
    #[serde(default)]
    pub updates: UpdateSettings,
}

impl GlobalConfig {
    /// The platform-specific configuration file path.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined and no
    /// `REVIEWTASK_CONFIG_PATH` override is set.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("REVIEWTASK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".reviewtask")
            .join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file path.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file syntax in {}", path.display()))
    }

    /// Persist to the default location, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the path cannot be resolved or written.
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?).await
    }

    /// Persist to a specific file path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Record that the release feed was just queried.
    pub fn mark_checked(&mut self, now: DateTime<Utc>) {
        self.updates.last_checked_at = Some(now);
    }
}

/// Whether an automatic update check is due.
///
/// Pure over its inputs: `enabled` and `interval_hours` come from
/// configuration, `last_checked` is the recorded timestamp of the
/// previous check (or `None` if never checked), and `now` is supplied by
/// the caller. An interval of `0` disables checking.
#[must_use]
pub fn should_check(
    enabled: bool,
    interval_hours: u64,
    last_checked: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if !enabled || interval_hours == 0 {
        return false;
    }
    match last_checked {
        None => true,
        Some(last) => (now - last).num_hours() >= interval_hours as i64,
    }
}
