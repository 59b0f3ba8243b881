//! Archive backed by the versioned document API.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::cache::ManifestCache;
use crate::client::{ControlPlaneClient, DocumentRequest, DocumentStatus};
use crate::manifest::{FileInfo, Manifest};

use super::error::{ArchiveError, ArchiveResult};
use super::memo::ResourceMemo;
use super::traits::{Archive, LATEST_VERSION};

/// Default jitter unit; the pre-call delay is a random multiple of it.
pub const DEFAULT_JITTER_UNIT: Duration = Duration::from_secs(1);

/// Upper bound on the jitter multiple.
pub const MAX_JITTER_UNITS: u32 = 15;

/// Fetches package manifests stored as documents.
///
/// Before fetching content the archive describes the document and compares
/// its hash with the locally cached one; a match serves the manifest from the
/// cache. The document's own name becomes the cache identity, since a shared
/// document is addressed by ARN rather than by the name it was requested as.
///
/// Each metadata call is preceded by a random delay of up to
/// [`MAX_JITTER_UNITS`] jitter units to spread fleet-wide fetches.
pub struct DocumentArchive<C: ControlPlaneClient> {
    client: C,
    cache: Arc<dyn ManifestCache>,
    memo: ResourceMemo,
    jitter_unit: Duration,
}

impl<C: ControlPlaneClient> DocumentArchive<C> {
    /// Create an archive over `client`, caching into `cache`.
    pub fn new(client: C, cache: Arc<dyn ManifestCache>) -> Self {
        Self {
            client,
            cache,
            memo: ResourceMemo::new(),
            jitter_unit: DEFAULT_JITTER_UNIT,
        }
    }

    /// Set the jitter unit. Zero disables the pre-call delay.
    pub fn with_jitter_unit(mut self, unit: Duration) -> Self {
        self.jitter_unit = unit;
        self
    }

    /// The configured jitter unit.
    pub fn jitter_unit(&self) -> Duration {
        self.jitter_unit
    }

    fn jitter(&self) {
        if self.jitter_unit.is_zero() {
            return;
        }
        let units = rand::rng().random_range(0..=MAX_JITTER_UNITS);
        let delay = self.jitter_unit * units;
        debug!(delay_ms = delay.as_millis() as u64, "Delaying document request");
        std::thread::sleep(delay);
    }

    fn request(name: &str, version: &str) -> DocumentRequest {
        DocumentRequest {
            name: name.to_string(),
            version_name: (version != LATEST_VERSION).then(|| version.to_string()),
        }
    }

    fn client_error<'a>(operation: &'static str, name: &'a str) -> impl FnOnce(crate::client::ClientError) -> ArchiveError + 'a {
        move |source| ArchiveError::Client {
            operation,
            name: name.to_string(),
            source,
        }
    }

    fn require_active(name: &str, status: &DocumentStatus) -> ArchiveResult<()> {
        if *status != DocumentStatus::Active {
            return Err(ArchiveError::DocumentNotActive {
                name: name.to_string(),
                status: status.clone(),
            });
        }
        Ok(())
    }

    /// Serve the manifest from the disk cache when the stored hash matches.
    fn cached_content(&self, identity: &str, document_version: &str, hash: &str, version_name: Option<&str>) -> Option<String> {
        let version_name = version_name?;
        // Hash cache misses and read errors both just mean "refetch".
        let cached_hash = match self.cache.read_manifest_hash(identity, document_version) {
            Ok(hash) => hash?,
            Err(e) => {
                debug!(identity, error = %e, "Manifest hash unreadable, refetching");
                return None;
            }
        };
        if cached_hash != hash {
            return None;
        }
        let content = self.cache.read_manifest(identity, version_name).ok()??;
        String::from_utf8(content).ok()
    }
}

impl<C: ControlPlaneClient> Archive for DocumentArchive<C> {
    fn name(&self) -> &'static str {
        "document"
    }

    fn cache(&self) -> &dyn ManifestCache {
        self.cache.as_ref()
    }

    fn download_archive_info(&self, name: &str, version: &str) -> ArchiveResult<String> {
        if let Some(content) = self.memo.content(name, version) {
            debug!(name, version, "Document already fetched by this archive");
            return Ok(content);
        }

        let request = Self::request(name, version);
        self.jitter();
        let description = self
            .client
            .describe_document(&request)
            .map_err(Self::client_error("DescribeDocument", name))?;
        Self::require_active(name, &description.status)?;

        let identity = if description.name.is_empty() {
            name.to_string()
        } else {
            description.name.clone()
        };

        if let Some(content) = self.cached_content(
            &identity,
            &description.document_version,
            &description.hash,
            description.version_name.as_deref(),
        ) {
            debug!(name, identity = %identity, "Document hash unchanged, using cached manifest");
            self.memo.store_content(name, version, &content, &identity);
            return Ok(content);
        }

        let document = self
            .client
            .get_document(&request)
            .map_err(Self::client_error("GetDocument", name))?;
        Self::require_active(name, &document.status)?;

        if document.content.trim().is_empty() {
            return Err(ArchiveError::EmptyManifest {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        if !description.hash.is_empty() && !description.document_version.is_empty() {
            if let Err(e) =
                self.cache
                    .write_manifest_hash(&identity, &description.document_version, &description.hash)
            {
                warn!(identity = %identity, error = %e, "Failed to record document hash");
            }
        }

        self.memo.store_content(name, version, &document.content, &identity);
        self.memo.store_attachments(name, version, document.attachments_content);
        Ok(document.content)
    }

    fn set_resource(&self, name: &str, version: &str, manifest: &Manifest) {
        if !manifest.version.is_empty() {
            self.memo.bind_version(name, version, &manifest.version);
        }
    }

    fn get_resource_arn(&self, name: &str, version: &str) -> String {
        self.memo
            .identity(name, version)
            .unwrap_or_else(|| name.to_string())
    }

    fn get_file_download_location(
        &self,
        file_name: &str,
        _file: &FileInfo,
        name: &str,
        version: &str,
    ) -> ArchiveResult<String> {
        let attachments = match self.memo.attachments(name, version) {
            Some(attachments) => attachments,
            None => {
                debug!(name, version, "Fetching document attachments");
                let document = self
                    .client
                    .get_document(&Self::request(name, version))
                    .map_err(Self::client_error("GetDocument", name))?;
                Self::require_active(name, &document.status)?;
                self.memo
                    .store_attachments(name, version, document.attachments_content.clone());
                document.attachments_content
            }
        };

        attachments
            .into_iter()
            .find(|attachment| attachment.name == file_name)
            .map(|attachment| attachment.url)
            .ok_or_else(|| ArchiveError::AttachmentNotFound {
                name: name.to_string(),
                file: file_name.to_string(),
            })
    }

    fn delete_manifest_from_cache(&self, identity: &str, version: &str) -> ArchiveResult<()> {
        self.memo.forget(identity, version);
        Ok(self.cache.delete_manifest(identity, version)?)
    }
}
