//! Package service error types.

use std::fmt;

use crate::archive::ArchiveError;
use crate::client::ClientError;
use crate::download::DownloadError;
use crate::manifest::ManifestError;
use crate::platform::PlatformError;

/// Errors that can occur in the package service.
#[derive(Debug)]
pub enum ServiceError {
    /// The archive failed to fetch the manifest.
    ManifestDownload {
        name: String,
        version: String,
        source: ArchiveError,
    },
    /// The fetched manifest could not be parsed.
    ManifestParse {
        name: String,
        version: String,
        source: ManifestError,
    },
    /// Reading, writing or invalidating the manifest cache failed.
    Cache {
        name: String,
        version: String,
        source: ArchiveError,
    },
    /// Host facts could not be collected.
    Platform(PlatformError),
    /// No file in the manifest matches this host.
    Resolution {
        name: String,
        version: String,
        source: ManifestError,
    },
    /// The archive could not say where the file lives.
    FileLocation { file: String, source: ArchiveError },
    /// The artifact download failed.
    Download { file: String, source: DownloadError },
    /// The downloader reported success without a file.
    EmptyDownload { file: String },
    /// Telemetry submission failed.
    Report(ClientError),
}

impl ServiceError {
    /// Failures in the download stage, which earn one retry with a fresh
    /// manifest.
    pub fn is_download_failure(&self) -> bool {
        matches!(
            self,
            Self::FileLocation { .. } | Self::Download { .. } | Self::EmptyDownload { .. }
        )
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestDownload { name, version, source } => {
                write!(f, "failed to download manifest for {} {}: {}", name, version, source)
            }
            Self::ManifestParse { name, version, source } => {
                write!(f, "invalid manifest for {} {}: {}", name, version, source)
            }
            Self::Cache { name, version, source } => {
                write!(f, "manifest cache error for {} {}: {}", name, version, source)
            }
            Self::Platform(e) => write!(f, "failed to collect platform facts: {}", e),
            Self::Resolution { name, version, source } => {
                write!(f, "cannot resolve {} {} for this host: {}", name, version, source)
            }
            Self::FileLocation { file, source } => {
                write!(f, "cannot locate file {}: {}", file, source)
            }
            Self::Download { file, source } => write!(f, "failed to download {}: {}", file, source),
            Self::EmptyDownload { file } => write!(f, "download of {} produced no file", file),
            Self::Report(e) => write!(f, "failed to report package result: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ManifestDownload { source, .. }
            | Self::Cache { source, .. }
            | Self::FileLocation { source, .. } => Some(source),
            Self::ManifestParse { source, .. } | Self::Resolution { source, .. } => Some(source),
            Self::Download { source, .. } => Some(source),
            Self::Platform(e) => Some(e),
            Self::Report(e) => Some(e),
            Self::EmptyDownload { .. } => None,
        }
    }
}

impl From<PlatformError> for ServiceError {
    fn from(e: PlatformError) -> Self {
        Self::Platform(e)
    }
}

/// Result alias for package service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
