//! Archive error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::client::{ClientError, DocumentStatus};

/// Errors raised by an archive strategy.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A control-plane call failed after retries.
    #[error("{operation} for {name} failed: {source}")]
    Client {
        operation: &'static str,
        name: String,
        #[source]
        source: ClientError,
    },

    /// The document exists but is not usable.
    #[error("document {name} is not active (status {status:?})")]
    DocumentNotActive { name: String, status: DocumentStatus },

    /// The control plane returned no manifest content.
    #[error("empty manifest returned for {name} version {version}")]
    EmptyManifest { name: String, version: String },

    /// The manifest file entry has no download location.
    #[error("file {file} has no download location")]
    MissingDownloadLocation { file: String },

    /// The document carries no attachment for the file.
    #[error("document {name} has no attachment named {file}")]
    AttachmentNotFound { name: String, file: String },

    /// Manifest cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result alias for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
