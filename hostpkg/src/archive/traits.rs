//! The archive capability shared by every strategy.

use crate::cache::ManifestCache;
use crate::manifest::{FileInfo, Manifest};

use super::error::ArchiveResult;

/// Sentinel version meaning "whatever the control plane considers newest".
pub const LATEST_VERSION: &str = "latest";

/// Normalize a requested version.
///
/// Empty input and any casing of `latest` become [`LATEST_VERSION`]; anything
/// else passes through unchanged.
pub fn resolve_version(version: &str) -> String {
    if version.is_empty() || version.eq_ignore_ascii_case(LATEST_VERSION) {
        LATEST_VERSION.to_string()
    } else {
        version.to_string()
    }
}

/// Fetches manifests and resolves file locations for one control-plane API.
///
/// Implementations keep an in-instance memo of fetched manifests, so repeated
/// calls for the same `(name, version)` during one operation hit the network
/// once.
pub trait Archive: Send + Sync {
    /// Short strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// The manifest cache this archive reads and writes.
    fn cache(&self) -> &dyn ManifestCache;

    /// Normalize `(name, version)` before any lookup.
    fn get_resource_version(&self, name: &str, version: &str) -> (String, String) {
        (name.to_string(), resolve_version(version))
    }

    /// Fetch the raw manifest for `(name, version)`.
    fn download_archive_info(&self, name: &str, version: &str) -> ArchiveResult<String>;

    /// Bind the requested `(name, version)` to a parsed manifest, so later
    /// lookups under the manifest's concrete version resolve the same identity.
    fn set_resource(&self, name: &str, version: &str, manifest: &Manifest);

    /// Identity under which manifests for `(name, version)` are cached.
    fn get_resource_arn(&self, name: &str, version: &str) -> String;

    /// Resolve a manifest file entry to a fetchable URL.
    ///
    /// # Arguments
    ///
    /// * `file_name` - Key of the file in the manifest file table
    /// * `file` - The manifest's entry for that file
    /// * `name` - Requested package name
    /// * `version` - Requested or resolved package version
    fn get_file_download_location(
        &self,
        file_name: &str,
        file: &FileInfo,
        name: &str,
        version: &str,
    ) -> ArchiveResult<String>;

    /// Read a cached manifest by identity and version.
    fn read_manifest_from_cache(&self, identity: &str, version: &str) -> ArchiveResult<Option<Vec<u8>>> {
        Ok(self.cache().read_manifest(identity, version)?)
    }

    /// Store a manifest by identity and version.
    fn write_manifest_to_cache(&self, identity: &str, version: &str, content: &[u8]) -> ArchiveResult<()> {
        Ok(self.cache().write_manifest(identity, version, content)?)
    }

    /// Drop a cached manifest and any in-instance memo of it, so the next
    /// download goes back to the network.
    fn delete_manifest_from_cache(&self, identity: &str, version: &str) -> ArchiveResult<()>;
}
