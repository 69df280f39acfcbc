//! Platform identification used for entry filtering and asset templates.
//!
//! All `#[cfg]` blocks for OS/architecture detection live here.

use serde::{Deserialize, Serialize};

/// A `{system, arch}` pair, e.g. `linux-x64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub system: String,
    pub arch: String,
}

impl Platform {
    pub fn new(system: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            arch: arch.into(),
        }
    }

    /// Name matched against an entry's `platforms` allow-list.
    pub fn name(&self) -> String {
        format!("{}-{}", self.system, self.arch)
    }

    /// Detect the platform this binary was built for.
    pub fn detect() -> Self {
        Self::new(current_system(), current_arch())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.system, self.arch)
    }
}

/// Returns the current system name.
pub fn current_system() -> &'static str {
    #[cfg(target_os = "android")]
    {
        "android"
    }
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "darwin"
    }
    #[cfg(not(any(
        target_os = "android",
        target_os = "linux",
        target_os = "windows",
        target_os = "macos"
    )))]
    {
        std::env::consts::OS
    }
}

/// Returns the current architecture name.
pub fn current_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" if cfg!(target_feature = "v7") => "armv7",
        "arm" => "arm",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        let platform = Platform::new("linux", "x64");
        assert_eq!(platform.name(), "linux-x64");
        assert_eq!(platform.to_string(), "linux-x64");
    }

    #[test]
    fn test_detect_is_not_empty() {
        let platform = Platform::detect();
        assert!(!platform.system.is_empty());
        assert!(!platform.arch.is_empty());
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_detect_linux_x64() {
        assert_eq!(Platform::detect().name(), "linux-x64");
    }
}
