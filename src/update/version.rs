//! Semantic version parsing and comparison for update checks.
//!
//! Release tags follow `vMAJOR.MINOR.PATCH` with an optional prerelease
//! suffix (`v1.2.3-rc.1`). Local development builds report the literal
//! version `dev`, which is defined to be newer than every numeric release
//! so that an unreleased build is never flagged as outdated.

use std::fmt;

use crate::update::error::UpdateError;

/// Sentinel version string reported by development builds.
pub const DEV_VERSION: &str = "dev";

/// A parsed semantic version.
///
/// The numeric triple is compared lexicographically (major, then minor,
/// then patch). The `dev` sentinel compares greater than any numeric
/// version. Prerelease/build suffixes are stripped during parsing and do
/// not participate in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticVersion {
    /// Major version component.
    pub major: u64,
    /// Minor version component.
    pub minor: u64,
    /// Patch version component.
    pub patch: u64,
    dev: bool,
}

/// Relationship of one version to another, as reported by [`compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// The first version is strictly newer than the second.
    Newer,
    /// Both versions are equal.
    Same,
    /// The first version is strictly older than the second.
    Older,
}

impl SemanticVersion {
    /// Construct a numeric version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            dev: false,
        }
    }

    /// The development sentinel, newer than every numeric version.
    #[must_use]
    pub const fn dev() -> Self {
        Self {
            major: 0,
            minor: 0,
            patch: 0,
            dev: true,
        }
    }

    /// Whether this is the development sentinel.
    #[must_use]
    pub const fn is_dev(&self) -> bool {
        self.dev
    }

    /// Parse a version string.
    ///
    /// Accepts an optional leading `v`, strips anything from the first
    /// `-` onward (prerelease/build metadata), and requires exactly three
    /// non-negative integer components separated by `.`. The literal
    /// string `dev` (case-sensitive) parses to the sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidVersion`] naming the component that
    /// failed to parse, or describing the malformed shape.
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        if text == DEV_VERSION {
            return Ok(Self::dev());
        }

        let normalized = text.strip_prefix('v').unwrap_or(text);
        // Prerelease and build suffixes do not participate in ordering.
        let numeric = normalized
            .split_once('-')
            .map_or(normalized, |(core, _)| core);

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() != 3 {
            return Err(UpdateError::InvalidVersion {
                version: text.to_string(),
                reason: format!("expected 3 components, found {}", parts.len()),
            });
        }

        let component = |index: usize, name: &str| -> Result<u64, UpdateError> {
            parts[index].parse::<u64>().map_err(|_| UpdateError::InvalidVersion {
                version: text.to_string(),
                reason: format!("invalid {name} component '{}'", parts[index]),
            })
        };

        Ok(Self {
            major: component(0, "major")?,
            minor: component(1, "minor")?,
            patch: component(2, "patch")?,
            dev: false,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dev {
            write!(f, "{DEV_VERSION}")
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.dev, other.dev) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => (self.major, self.minor, self.patch).cmp(&(
                other.major,
                other.minor,
                other.patch,
            )),
        }
    }
}

/// Compare two parsed versions, reporting the relation of `a` to `b`.
#[must_use]
pub fn compare(a: &SemanticVersion, b: &SemanticVersion) -> VersionComparison {
    match a.cmp(b) {
        std::cmp::Ordering::Greater => VersionComparison::Newer,
        std::cmp::Ordering::Equal => VersionComparison::Same,
        std::cmp::Ordering::Less => VersionComparison::Older,
    }
}

/// Parse two version strings and compare them in one step.
///
/// # Errors
///
/// Returns [`UpdateError::InvalidVersion`] if either string fails to parse.
pub fn compare_str(a: &str, b: &str) -> Result<VersionComparison, UpdateError> {
    Ok(compare(&SemanticVersion::parse(a)?, &SemanticVersion::parse(b)?))
}
