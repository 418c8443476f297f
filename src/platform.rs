//! Host platform detection.
//!
//! Resolved once at startup and carried in the assembly context so each
//! step sees the same answer.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    MacOs,
    Windows,
    Other(String),
}

impl HostPlatform {
    /// Platform this binary was compiled for.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &str) -> Self {
        match os {
            "linux" => HostPlatform::Linux,
            "macos" => HostPlatform::MacOs,
            "windows" => HostPlatform::Windows,
            other => HostPlatform::Other(other.to_string()),
        }
    }

    /// Linux and macOS are supported; anything else runs best-effort.
    pub fn is_supported(&self) -> bool {
        matches!(self, HostPlatform::Linux | HostPlatform::MacOs)
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Linux => f.write_str("Linux"),
            HostPlatform::MacOs => f.write_str("MacOS"),
            HostPlatform::Windows => f.write_str("Windows"),
            HostPlatform::Other(name) => f.write_str(name),
        }
    }
}
