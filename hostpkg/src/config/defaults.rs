//! Default values for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::client::DEFAULT_TIMEOUT_SECS;

/// Default control-plane request timeout in seconds.
pub const DEFAULT_CONTROL_PLANE_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT_SECS;

/// Default retries after the first control-plane attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "hostpkg.log";

/// `~/.hostpkg/packages`
pub fn default_package_root() -> PathBuf {
    config_directory().join("packages")
}

/// `~/.hostpkg/manifests`
pub fn default_cache_dir() -> PathBuf {
    config_directory().join("manifests")
}

/// `~/.hostpkg/downloads`
pub fn default_download_dir() -> PathBuf {
    config_directory().join("downloads")
}

/// `~/.hostpkg/logs`
pub fn default_log_dir() -> PathBuf {
    config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            packages: PackagesSettings {
                root: default_package_root(),
                cache_dir: default_cache_dir(),
                download_dir: default_download_dir(),
                archive: ArchiveKind::default(),
            },
            control_plane: ControlPlaneSettings {
                endpoint: None,
                timeout: DEFAULT_CONTROL_PLANE_TIMEOUT_SECS,
                max_retries: DEFAULT_MAX_RETRIES,
            },
            instance: InstanceSettings::default(),
            logging: LoggingSettings {
                directory: default_log_dir(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}
