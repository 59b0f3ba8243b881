//! Installer error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;
use crate::service::ServiceError;

/// A field-specific validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is empty or absent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The package name cannot be used as a directory name.
    #[error("name '{0}' is not a valid package name")]
    InvalidName(String),

    /// The version is not `major.minor.build`.
    #[error("{field} '{value}' is not a valid version (expected major.minor.build)")]
    InvalidVersion { field: &'static str, value: String },

    /// The value cannot be used as a single directory name.
    #[error("{field} '{value}' is not a plain path component")]
    InvalidPathComponent { field: &'static str, value: String },

    /// The reboot flag is not a boolean.
    #[error("reboot '{0}' is not a valid boolean")]
    InvalidReboot(String),

    /// A command string failed the shape check.
    #[error("{field} command is malformed: {reason}")]
    InvalidCommand { field: &'static str, reason: String },

    /// The request combines options that cannot be used together.
    #[error("{0}")]
    InvalidCombination(String),
}

/// Errors raised while installing or uninstalling a package.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The request or the local package manifest is invalid.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Another operation holds the package.
    #[error("package {name} is already being operated on ({held_by})")]
    Locked { name: String, held_by: String },

    /// Manifest or artifact acquisition failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A source override could not be fetched.
    #[error("failed to fetch package from source: {0}")]
    Source(#[source] DownloadError),

    /// The artifact could not be extracted.
    #[error("failed to extract {archive} into {dest}: {reason}")]
    Extract {
        archive: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    /// An archive entry would land outside the destination directory.
    #[error("archive {archive} entry '{entry}' escapes the destination")]
    UnsafeArchiveEntry { archive: PathBuf, entry: String },

    /// The local package manifest could not be read or parsed.
    #[error("invalid package manifest {path}: {reason}")]
    PackageManifest { path: PathBuf, reason: String },

    /// Filesystem failure in the package repository.
    #[error("{action} {path} failed: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for installer operations.
pub type InstallResult<T> = Result<T, InstallError>;
