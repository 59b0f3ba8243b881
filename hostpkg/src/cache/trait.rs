//! Manifest cache trait definition for dependency injection.

use super::types::CacheResult;

/// Key-value store of raw manifest bytes.
///
/// The first key is the package identity (a package ARN, document ARN, or the
/// requested name, depending on the archive), the second is a concrete
/// version. `"latest"` is resolved before anything is cached.
///
/// Implementations must be safe for concurrent reads and writes from
/// independent package operations.
pub trait ManifestCache: Send + Sync {
    /// Read a cached manifest. `Ok(None)` means the entry does not exist.
    fn read_manifest(&self, package: &str, version: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write (or overwrite) a cached manifest.
    fn write_manifest(&self, package: &str, version: &str, content: &[u8]) -> CacheResult<()>;

    /// Delete a cached manifest. Deleting a missing entry is not an error.
    fn delete_manifest(&self, package: &str, version: &str) -> CacheResult<()>;

    /// Read the content hash recorded for a document version.
    ///
    /// Backends that do not track hashes report every lookup as a miss,
    /// which callers treat as "must refetch".
    fn read_manifest_hash(&self, _package: &str, _document_version: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    /// Record the content hash for a document version.
    fn write_manifest_hash(
        &self,
        _package: &str,
        _document_version: &str,
        _hash: &str,
    ) -> CacheResult<()> {
        Ok(())
    }
}

impl<T: ManifestCache + ?Sized> ManifestCache for std::sync::Arc<T> {
    fn read_manifest(&self, package: &str, version: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).read_manifest(package, version)
    }

    fn write_manifest(&self, package: &str, version: &str, content: &[u8]) -> CacheResult<()> {
        (**self).write_manifest(package, version, content)
    }

    fn delete_manifest(&self, package: &str, version: &str) -> CacheResult<()> {
        (**self).delete_manifest(package, version)
    }

    fn read_manifest_hash(&self, package: &str, document_version: &str) -> CacheResult<Option<String>> {
        (**self).read_manifest_hash(package, document_version)
    }

    fn write_manifest_hash(&self, package: &str, document_version: &str, hash: &str) -> CacheResult<()> {
        (**self).write_manifest_hash(package, document_version, hash)
    }
}
