//! Archive backed by the manifest distribution API.

use std::sync::Arc;

use tracing::debug;

use crate::cache::ManifestCache;
use crate::client::{ControlPlaneClient, GetManifestRequest};
use crate::manifest::{FileInfo, Manifest};

use super::error::{ArchiveError, ArchiveResult};
use super::memo::ResourceMemo;
use super::traits::Archive;

/// Fetches manifests with one `GetManifest` call per `(name, version)`.
///
/// The requested name is used as-is for cache identity, and file locations
/// come straight from the manifest's file table.
pub struct BirdwatcherArchive<C: ControlPlaneClient> {
    client: C,
    cache: Arc<dyn ManifestCache>,
    memo: ResourceMemo,
}

impl<C: ControlPlaneClient> BirdwatcherArchive<C> {
    /// Create an archive over `client`, caching into `cache`.
    pub fn new(client: C, cache: Arc<dyn ManifestCache>) -> Self {
        Self {
            client,
            cache,
            memo: ResourceMemo::new(),
        }
    }
}

impl<C: ControlPlaneClient> Archive for BirdwatcherArchive<C> {
    fn name(&self) -> &'static str {
        "birdwatcher"
    }

    fn cache(&self) -> &dyn ManifestCache {
        self.cache.as_ref()
    }

    fn download_archive_info(&self, name: &str, version: &str) -> ArchiveResult<String> {
        if let Some(content) = self.memo.content(name, version) {
            debug!(name, version, "Manifest already fetched by this archive");
            return Ok(content);
        }

        let request = GetManifestRequest {
            package_name: name.to_string(),
            package_version: version.to_string(),
        };
        let response = self
            .client
            .get_manifest(&request)
            .map_err(|e| ArchiveError::Client {
                operation: "GetManifest",
                name: name.to_string(),
                source: e,
            })?;

        if response.manifest.trim().is_empty() {
            return Err(ArchiveError::EmptyManifest {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        self.memo.store_content(name, version, &response.manifest, name);
        Ok(response.manifest)
    }

    fn set_resource(&self, name: &str, version: &str, manifest: &Manifest) {
        if !manifest.version.is_empty() {
            self.memo.bind_version(name, version, &manifest.version);
        }
    }

    fn get_resource_arn(&self, name: &str, _version: &str) -> String {
        name.to_string()
    }

    fn get_file_download_location(
        &self,
        file_name: &str,
        file: &FileInfo,
        _name: &str,
        _version: &str,
    ) -> ArchiveResult<String> {
        if file.download_location.is_empty() {
            return Err(ArchiveError::MissingDownloadLocation {
                file: file_name.to_string(),
            });
        }
        Ok(file.download_location.clone())
    }

    fn delete_manifest_from_cache(&self, identity: &str, version: &str) -> ArchiveResult<()> {
        self.memo.forget(identity, version);
        Ok(self.cache.delete_manifest(identity, version)?)
    }
}
