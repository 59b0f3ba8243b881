//! In-process manifest cache.

use std::collections::HashMap;
use std::sync::RwLock;

use super::r#trait::ManifestCache;
use super::types::{check_key, CacheResult};

type Key = (String, String);

/// Manifest cache held entirely in process memory.
///
/// Contents vanish with the process. Used by tests and by callers that only
/// need deduplication for the duration of one operation.
#[derive(Debug, Default)]
pub struct MemoryManifestCache {
    manifests: RwLock<HashMap<Key, Vec<u8>>>,
    hashes: RwLock<HashMap<Key, String>>,
}

impl MemoryManifestCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached manifests.
    pub fn len(&self) -> usize {
        self.manifests.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if no manifests are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(package: &str, version: &str) -> Key {
    (package.to_string(), version.to_string())
}

impl ManifestCache for MemoryManifestCache {
    fn read_manifest(&self, package: &str, version: &str) -> CacheResult<Option<Vec<u8>>> {
        check_key(package, version)?;
        let manifests = self.manifests.read().unwrap_or_else(|e| e.into_inner());
        Ok(manifests.get(&key(package, version)).cloned())
    }

    fn write_manifest(&self, package: &str, version: &str, content: &[u8]) -> CacheResult<()> {
        check_key(package, version)?;
        let mut manifests = self.manifests.write().unwrap_or_else(|e| e.into_inner());
        manifests.insert(key(package, version), content.to_vec());
        Ok(())
    }

    fn delete_manifest(&self, package: &str, version: &str) -> CacheResult<()> {
        check_key(package, version)?;
        let mut manifests = self.manifests.write().unwrap_or_else(|e| e.into_inner());
        manifests.remove(&key(package, version));
        Ok(())
    }

    fn read_manifest_hash(&self, package: &str, document_version: &str) -> CacheResult<Option<String>> {
        check_key(package, document_version)?;
        let hashes = self.hashes.read().unwrap_or_else(|e| e.into_inner());
        Ok(hashes.get(&key(package, document_version)).cloned())
    }

    fn write_manifest_hash(&self, package: &str, document_version: &str, hash: &str) -> CacheResult<()> {
        check_key(package, document_version)?;
        let mut hashes = self.hashes.write().unwrap_or_else(|e| e.into_inner());
        hashes.insert(key(package, document_version), hash.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use std::sync::Arc;

    #[test]
    fn test_write_then_read() {
        let cache = MemoryManifestCache::new();
        cache.write_manifest("pkg", "1.0.0", b"{\"a\":1}").unwrap();

        let content = cache.read_manifest("pkg", "1.0.0").unwrap();
        assert_eq!(content.as_deref(), Some(&b"{\"a\":1}"[..]));
    }

    #[test]
    fn test_read_missing_is_none() {
        let cache = MemoryManifestCache::new();
        assert!(cache.read_manifest("pkg", "1.0.0").unwrap().is_none());
    }

    #[test]
    fn test_versions_are_independent() {
        let cache = MemoryManifestCache::new();
        cache.write_manifest("pkg", "1.0.0", b"one").unwrap();
        cache.write_manifest("pkg", "2.0.0", b"two").unwrap();

        assert_eq!(cache.read_manifest("pkg", "1.0.0").unwrap().unwrap(), b"one");
        assert_eq!(cache.read_manifest("pkg", "2.0.0").unwrap().unwrap(), b"two");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_delete() {
        let cache = MemoryManifestCache::new();
        cache.write_manifest("pkg", "1.0.0", b"one").unwrap();
        cache.delete_manifest("pkg", "1.0.0").unwrap();
        assert!(cache.read_manifest("pkg", "1.0.0").unwrap().is_none());

        // Deleting again is fine
        cache.delete_manifest("pkg", "1.0.0").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hash_round_trip() {
        let cache = MemoryManifestCache::new();
        assert!(cache.read_manifest_hash("doc", "3").unwrap().is_none());

        cache.write_manifest_hash("doc", "3", "abc123").unwrap();
        assert_eq!(cache.read_manifest_hash("doc", "3").unwrap().as_deref(), Some("abc123"));
        // Hashes do not leak into the manifest table
        assert!(cache.read_manifest("doc", "3").unwrap().is_none());
    }

    #[test]
    fn test_empty_key_rejected() {
        let cache = MemoryManifestCache::new();
        assert!(matches!(
            cache.write_manifest("", "1.0.0", b"x"),
            Err(CacheError::EmptyKey("package"))
        ));
        assert!(matches!(
            cache.read_manifest("pkg", ""),
            Err(CacheError::EmptyKey("version"))
        ));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(MemoryManifestCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let version = format!("{}.0.0", i);
                    cache.write_manifest("pkg", &version, version.as_bytes()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.read_manifest("pkg", "5.0.0").unwrap().unwrap(), b"5.0.0");
    }
}
