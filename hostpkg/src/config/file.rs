//! Configuration file handling for ~/.hostpkg/config.ini.
//!
//! Parsing lives in [`super::parser`], serialization in [`super::writer`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;

/// Errors loading or saving config.ini.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but is not valid INI
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A key holds a value the agent cannot use
    #[error("[{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Writing the file or its parent directory failed
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigFile {
    /// Load from `~/.hostpkg/config.ini`.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.is_file() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        super::parser::parse_ini(&ini)
    }

    /// Write to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, super::writer::to_config_string(self)).map_err(write_error)
    }
}

/// `~/.hostpkg`, or `./.hostpkg` when there is no home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".hostpkg")
}

/// `~/.hostpkg/config.ini`
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

const CONFIG_FILE_NAME: &str = "config.ini";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArchiveKind, DEFAULT_CONTROL_PLANE_TIMEOUT_SECS, DEFAULT_LOG_FILE};
    use tempfile::TempDir;

    #[test]
    fn test_defaults_live_under_hostpkg_dir() {
        let config = ConfigFile::default();

        assert_eq!(config.packages.archive, ArchiveKind::Birdwatcher);
        assert!(config.packages.root.ends_with(".hostpkg/packages"));
        assert!(config.control_plane.endpoint.is_none());
        assert_eq!(config.control_plane.timeout, DEFAULT_CONTROL_PLANE_TIMEOUT_SECS);
        assert_eq!(config.logging.file, DEFAULT_LOG_FILE);
        assert!(config_file_path().ends_with(".hostpkg/config.ini"));
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[packages\nroot = /x\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigFileError::Parse { path: p, .. }) if p == path
        ));
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.packages.root = temp.path().join("packages");
        config.packages.archive = ArchiveKind::Document;
        config.control_plane.endpoint = Some("https://ssm.example.com".to_string());
        config.control_plane.max_retries = 5;
        config.instance.instance_id = "i-0123456789abcdef0".to_string();
        config.instance.region = "us-west-2".to_string();

        config.save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }
}
