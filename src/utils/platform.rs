//! Platform identity for release artifact selection.
//!
//! Release artifacts are published for a fixed os/arch matrix. The
//! running platform is detected on demand as a pure function so tests can
//! pass arbitrary values without mutating shared state. Values outside
//! the published matrix normalize to the nearest supported fallback
//! rather than failing, since the artifact naming scheme only covers the
//! matrix below.

use std::fmt;
use std::path::Path;

/// Operating systems with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux (also the fallback for unrecognized unix-family systems).
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
}

/// CPU architectures with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// x86-64 (also the fallback for unrecognized architectures).
    Amd64,
    /// 64-bit ARM.
    Arm64,
}

/// The os/arch pair used to pick a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Target operating system.
    pub os: Os,
    /// Target CPU architecture.
    pub arch: Arch,
}

impl Os {
    /// The identifier used in artifact filenames.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }
}

impl Arch {
    /// The identifier used in artifact filenames.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }
}

impl Platform {
    /// Detect the running platform.
    ///
    /// Computed fresh on every call from `std::env::consts`; unrecognized
    /// values fall back to `linux`/`amd64`.
    #[must_use]
    pub fn current() -> Self {
        Self::from_env(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map raw os/arch strings onto the supported matrix.
    #[must_use]
    pub fn from_env(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" | "darwin" => Os::Darwin,
            "windows" => Os::Windows,
            _ => Os::Linux,
        };
        let arch = match arch {
            "aarch64" | "arm64" => Arch::Arm64,
            _ => Arch::Amd64,
        };
        Self { os, arch }
    }

    /// The binary filename expected inside a release archive.
    #[must_use]
    pub fn binary_name(&self, tool: &str) -> String {
        match self.os {
            Os::Windows => format!("{tool}.exe"),
            _ => tool.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Whether the file at `path` can be executed.
///
/// On unix this reads the permission bits; on Windows, where execute
/// permission is conveyed by extension rather than mode bits, it checks
/// for an executable extension.
#[cfg(unix)]
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// Whether the file at `path` can be executed.
#[cfg(windows)]
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
        matches!(ext.to_ascii_lowercase().as_str(), "exe" | "bat" | "cmd" | "com")
    })
}
