//! On-disk manifest cache.
//!
//! Each entry is a single file named `{package}_{version}_{digest}.json`
//! under the cache directory, holding the raw manifest bytes. Document
//! hashes live beside them with a `.hash` extension. Files are created
//! owner read/write only.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::r#trait::ManifestCache;
use super::types::{check_key, CacheError, CacheResult};

const MANIFEST_EXTENSION: &str = "json";
const HASH_EXTENSION: &str = "hash";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Number of hex digits of the key digest kept in file names.
const DIGEST_LEN: usize = 16;

/// Build the file name for a cache entry.
///
/// Key components may be ARNs (`arn:aws:ssm:...:document/Name`), so every
/// character outside `[A-Za-z0-9._-]` is replaced with `_` for the readable
/// part. A digest of the unmodified key follows it, keeping keys that
/// sanitize alike in separate files.
pub fn cache_file_name(package: &str, version: &str) -> String {
    entry_file_name(package, version, MANIFEST_EXTENSION)
}

fn hash_file_name(package: &str, document_version: &str) -> String {
    entry_file_name(package, document_version, HASH_EXTENSION)
}

fn entry_file_name(package: &str, version: &str, extension: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(package.as_bytes());
    hasher.update([0u8]);
    hasher.update(version.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(
        "{}_{}_{}.{}",
        sanitize(package),
        sanitize(version),
        &digest[..DIGEST_LEN],
        extension
    )
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Manifest cache backed by files in a directory.
#[derive(Debug, Clone)]
pub struct DiskManifestCache {
    directory: PathBuf,
}

impl DiskManifestCache {
    /// Open (creating if needed) a cache rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> CacheResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| CacheError::CreateDir {
            path: directory.clone(),
            source: e,
        })?;
        restrict_permissions(&directory, 0o700);
        Ok(Self { directory })
    }

    /// The cache directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn read_file(&self, name: &str) -> CacheResult<Option<Vec<u8>>> {
        let path = self.directory.join(name);
        match fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Read { path, source: e }),
        }
    }

    /// Write through a temp file and rename so concurrent readers never see a
    /// partially written entry.
    fn write_file(&self, name: &str, content: &[u8]) -> CacheResult<()> {
        let path = self.directory.join(name);
        let temp = self.directory.join(format!(
            ".{}.{}.{}.tmp",
            name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let write = || -> std::io::Result<()> {
            let mut file = open_private(&temp)?;
            file.write_all(content)?;
            file.sync_all()?;
            fs::rename(&temp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            CacheError::Write {
                path: path.clone(),
                source: e,
            }
        })?;

        debug!(path = %path.display(), bytes = content.len(), "Wrote cache entry");
        Ok(())
    }

    fn delete_file(&self, name: &str) -> CacheResult<()> {
        let path = self.directory.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Delete { path, source: e }),
        }
    }
}

impl ManifestCache for DiskManifestCache {
    fn read_manifest(&self, package: &str, version: &str) -> CacheResult<Option<Vec<u8>>> {
        check_key(package, version)?;
        self.read_file(&cache_file_name(package, version))
    }

    fn write_manifest(&self, package: &str, version: &str, content: &[u8]) -> CacheResult<()> {
        check_key(package, version)?;
        self.write_file(&cache_file_name(package, version), content)
    }

    fn delete_manifest(&self, package: &str, version: &str) -> CacheResult<()> {
        check_key(package, version)?;
        self.delete_file(&cache_file_name(package, version))
    }

    fn read_manifest_hash(&self, package: &str, document_version: &str) -> CacheResult<Option<String>> {
        check_key(package, document_version)?;
        Ok(self
            .read_file(&hash_file_name(package, document_version))?
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string()))
    }

    fn write_manifest_hash(&self, package: &str, document_version: &str, hash: &str) -> CacheResult<()> {
        check_key(package, document_version)?;
        self.write_file(&hash_file_name(package, document_version), hash.as_bytes())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        debug!(path = %path.display(), error = %e, "Could not restrict cache directory permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_file_name() {
        let name = cache_file_name("pkg", "1.0.0");
        assert!(name.starts_with("pkg_1.0.0_"), "{name}");
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "pkg_1.0.0_".len() + DIGEST_LEN + ".json".len());
        assert_eq!(name, cache_file_name("pkg", "1.0.0"));

        let arn = cache_file_name("arn:aws:ssm:us-east-1:123456789012:document/My-Pkg", "3");
        assert!(arn.starts_with("arn_aws_ssm_us-east-1_123456789012_document_My-Pkg_3_"));
        assert!(!arn.contains('/'));
    }

    #[test]
    fn test_keys_that_sanitize_alike_stay_apart() {
        let names = [
            cache_file_name("doc/a", "1"),
            cache_file_name("doc:a", "1"),
            cache_file_name("doc_a", "1"),
            cache_file_name("doc", "a_1"),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_ne!(cache_file_name("pkg", "1"), hash_file_name("pkg", "1"));

        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        cache.write_manifest("doc/a", "1", b"slash").unwrap();
        cache.write_manifest("doc:a", "1", b"colon").unwrap();
        cache.write_manifest("doc_a", "1", b"underscore").unwrap();

        assert_eq!(cache.read_manifest("doc/a", "1").unwrap().unwrap(), b"slash");
        assert_eq!(cache.read_manifest("doc:a", "1").unwrap().unwrap(), b"colon");
        assert_eq!(cache.read_manifest("doc_a", "1").unwrap().unwrap(), b"underscore");
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();

        cache.write_manifest("pkg", "1.0.0", b"{\"version\":\"1.0.0\"}").unwrap();
        let content = cache.read_manifest("pkg", "1.0.0").unwrap().unwrap();
        assert_eq!(content, b"{\"version\":\"1.0.0\"}");
        assert!(temp.path().join(cache_file_name("pkg", "1.0.0")).exists());
    }

    #[test]
    fn test_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let cache = DiskManifestCache::new(temp.path()).unwrap();
            cache.write_manifest("pkg", "1.0.0", b"persisted").unwrap();
        }
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        assert_eq!(cache.read_manifest("pkg", "1.0.0").unwrap().unwrap(), b"persisted");
    }

    #[test]
    fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        cache.write_manifest("pkg", "1.0.0", b"old").unwrap();
        cache.write_manifest("pkg", "1.0.0", b"new").unwrap();
        assert_eq!(cache.read_manifest("pkg", "1.0.0").unwrap().unwrap(), b"new");
    }

    #[test]
    fn test_read_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        assert!(cache.read_manifest("pkg", "9.9.9").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        cache.write_manifest("pkg", "1.0.0", b"x").unwrap();
        cache.delete_manifest("pkg", "1.0.0").unwrap();
        assert!(cache.read_manifest("pkg", "1.0.0").unwrap().is_none());
        cache.delete_manifest("pkg", "1.0.0").unwrap();
    }

    #[test]
    fn test_hash_round_trip() {
        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        cache.write_manifest_hash("doc", "2", "deadbeef").unwrap();
        assert_eq!(cache.read_manifest_hash("doc", "2").unwrap().as_deref(), Some("deadbeef"));
        assert!(cache.read_manifest_hash("doc", "3").unwrap().is_none());
    }

    #[test]
    fn test_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        let cache = DiskManifestCache::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(cache.directory(), dir.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let cache = DiskManifestCache::new(temp.path()).unwrap();
        cache.write_manifest("pkg", "1.0.0", b"x").unwrap();

        let mode = fs::metadata(temp.path().join(cache_file_name("pkg", "1.0.0")))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
