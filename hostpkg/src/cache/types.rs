//! Cache error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a manifest cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to create the cache directory.
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a cache entry.
    #[error("failed to read cache entry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a cache entry.
    #[error("failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete a cache entry.
    #[error("failed to delete cache entry {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key component was empty.
    #[error("cache key component '{0}' must not be empty")]
    EmptyKey(&'static str),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Reject empty key components before touching any backend.
pub(crate) fn check_key(package: &str, version: &str) -> CacheResult<()> {
    if package.is_empty() {
        return Err(CacheError::EmptyKey("package"));
    }
    if version.is_empty() {
        return Err(CacheError::EmptyKey("version"));
    }
    Ok(())
}
