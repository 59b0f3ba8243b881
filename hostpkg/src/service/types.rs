//! Package result and environment types.

use std::fmt;

use chrono::{DateTime, Utc};

/// The operation a result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageOperation {
    Install,
    Uninstall,
}

impl fmt::Display for PackageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "Install"),
            Self::Uninstall => write!(f, "Uninstall"),
        }
    }
}

/// Telemetry record for one install or uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageResult {
    /// Package name as requested.
    pub package_name: String,
    /// Version operated on.
    pub version: String,
    /// Version installed before the operation, if any.
    pub previous_version: Option<String>,
    /// What was attempted.
    pub operation: PackageOperation,
    /// When the operation started.
    pub started_at: DateTime<Utc>,
    /// Zero on success.
    pub exit_code: i64,
}

impl PackageResult {
    /// Start a result record stamped with the current time.
    pub fn new(package_name: impl Into<String>, version: impl Into<String>, operation: PackageOperation) -> Self {
        Self {
            package_name: package_name.into(),
            version: version.into(),
            previous_version: None,
            operation,
            started_at: Utc::now(),
            exit_code: 0,
        }
    }

    /// Set the previously installed version.
    pub fn with_previous_version(mut self, version: Option<String>) -> Self {
        self.previous_version = version;
        self
    }

    /// Set the exit code.
    pub fn with_exit_code(mut self, exit_code: i64) -> Self {
        self.exit_code = exit_code;
        self
    }
}

/// Instance attributes attached to telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
    pub availability_zone: String,
}
