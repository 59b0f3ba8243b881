//! Settings structs, one per `[section]` of the INI file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::service::InstanceInfo;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Local package layout and archive strategy
    pub packages: PackagesSettings,
    /// Control-plane endpoint and call behavior
    pub control_plane: ControlPlaneSettings,
    /// Instance attributes reported with results
    pub instance: InstanceSettings,
    /// Log file location
    pub logging: LoggingSettings,
}

/// Which control-plane API manifests come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveKind {
    /// Dedicated package manifest service.
    #[default]
    Birdwatcher,
    /// Versioned documents with attachments.
    Document,
}

impl FromStr for ArchiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birdwatcher" => Ok(Self::Birdwatcher),
            "document" => Ok(Self::Document),
            other => Err(format!("unknown archive '{}'", other)),
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Birdwatcher => write!(f, "birdwatcher"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// `[packages]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagesSettings {
    /// Root of `{root}/{name}/{version}/`
    pub root: PathBuf,
    /// Manifest cache directory
    pub cache_dir: PathBuf,
    /// Artifact download directory
    pub download_dir: PathBuf,
    pub archive: ArchiveKind,
}

/// `[control_plane]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPlaneSettings {
    /// Base URL. Unset means commands that need the network refuse to run.
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

/// `[instance]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSettings {
    pub instance_id: String,
    pub instance_type: String,
    pub region: String,
    pub availability_zone: String,
}

impl InstanceSettings {
    /// Telemetry view of these settings.
    pub fn instance_info(&self) -> InstanceInfo {
        InstanceInfo {
            instance_id: self.instance_id.clone(),
            instance_type: self.instance_type.clone(),
            region: self.region.clone(),
            availability_zone: self.availability_zone.clone(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}
