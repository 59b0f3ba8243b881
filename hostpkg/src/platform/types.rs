//! Platform fact and error types.

use std::fmt;

use thiserror::Error;

/// Facts describing the host, as used for manifest selection and telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformFacts {
    /// Normalized platform name (e.g. "ubuntu", "amazon", "windows").
    pub platform: String,
    /// Platform version (e.g. "22.04", "2", "10.0.17763").
    pub platform_version: String,
    /// Platform family (e.g. "debian", "rhel").
    pub platform_family: String,
    /// Normalized architecture ("amd64", "386", "arm64").
    pub architecture: String,
    /// Init system ("systemd", "upstart", "sysvinit", "launchd", "windows").
    pub init_system: String,
    /// Native package manager, when the family has one.
    pub package_manager: Option<String>,
}

impl fmt::Display for PlatformFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {})",
            self.platform, self.platform_version, self.platform_family, self.architecture
        )
    }
}

/// Platform detection errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// None of the detection sources produced a platform.
    #[error("unable to detect platform: {0}")]
    Undetected(String),

    /// The platform has no entry in the family table.
    #[error("unknown platform family for platform '{0}'")]
    UnknownFamily(String),

    /// The family has no entry in the package manager table.
    #[error("no package manager known for platform family '{0}'")]
    UnknownPackageManager(String),

    /// The current operating system is not supported.
    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),
}

/// Result alias for platform detection.
pub type PlatformResult<T> = Result<T, PlatformError>;
