//! The package service.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::archive::{Archive, LATEST_VERSION};
use crate::client::{ControlPlaneClient, PutConfigurePackageResultRequest};
use crate::download::ArtifactDownloader;
use crate::manifest::{find_file, parse_manifest, Manifest};
use crate::platform::PlatformProvider;

use super::error::{ServiceError, ServiceResult};
use super::trace::Tracer;
use super::types::{InstanceInfo, PackageResult};

/// A manifest fetched from the archive, with where it was cached.
#[derive(Debug, Clone)]
struct FetchedManifest {
    identity: String,
    version: String,
    same_as_cached: bool,
    manifest: Manifest,
}

/// Resolves, caches and downloads packages through an [`Archive`].
///
/// Every collaborator is injected, so tests can run the full resolution path
/// against in-memory mocks.
pub struct PackageService {
    archive: Arc<dyn Archive>,
    client: Arc<dyn ControlPlaneClient>,
    downloader: Arc<dyn ArtifactDownloader>,
    platform: Arc<dyn PlatformProvider>,
    instance: InstanceInfo,
}

impl PackageService {
    /// Create a service.
    ///
    /// # Arguments
    ///
    /// * `archive` - Strategy used to fetch manifests and locate files
    /// * `client` - Control-plane client used for telemetry
    /// * `downloader` - Fetches artifacts to local disk
    /// * `platform` - Supplies the host facts used for file selection
    pub fn new(
        archive: Arc<dyn Archive>,
        client: Arc<dyn ControlPlaneClient>,
        downloader: Arc<dyn ArtifactDownloader>,
        platform: Arc<dyn PlatformProvider>,
    ) -> Self {
        Self {
            archive,
            client,
            downloader,
            platform,
            instance: InstanceInfo::default(),
        }
    }

    /// Set the instance attributes attached to telemetry.
    pub fn with_instance_info(mut self, instance: InstanceInfo) -> Self {
        self.instance = instance;
        self
    }

    /// The active archive strategy.
    pub fn archive(&self) -> &dyn Archive {
        self.archive.as_ref()
    }

    /// Normalize a requested name and version.
    pub fn get_package_arn_and_version(&self, name: &str, version: &str) -> (String, String) {
        self.archive.get_resource_version(name, version)
    }

    /// Fetch, parse and cache the manifest for `(name, version)`.
    ///
    /// Returns the cache identity, the manifest's concrete version, and
    /// whether the manifest equals the one previously cached under that key.
    /// The fresh manifest is written to the cache either way.
    pub fn download_manifest(
        &self,
        tracer: &Tracer,
        name: &str,
        version: &str,
    ) -> ServiceResult<(String, String, bool)> {
        let (name, version) = self.get_package_arn_and_version(name, version);
        let fetched = self.fetch_manifest(tracer, &name, &version)?;
        Ok((fetched.identity, fetched.version, fetched.same_as_cached))
    }

    /// Download the artifact for this host and return its local path.
    ///
    /// A failed download is retried exactly once, after dropping the cached
    /// manifest and fetching it again.
    pub fn download_artifact(&self, tracer: &Tracer, name: &str, version: &str) -> ServiceResult<PathBuf> {
        let (name, version) = self.get_package_arn_and_version(name, version);
        let (identity, cache_version, manifest) = self.resolve_manifest(tracer, &name, &version)?;

        let first = match self.fetch_file(tracer, &name, &version, &manifest) {
            Ok(path) => return Ok(path),
            Err(e) if e.is_download_failure() => e,
            Err(e) => return Err(e),
        };

        warn!(
            name = %name,
            version = %version,
            error = %first,
            "Artifact download failed, refreshing manifest and retrying"
        );
        tracer.add_trace(format!("retry download {} {}", name, version), 0);

        self.archive
            .delete_manifest_from_cache(&identity, &cache_version)
            .map_err(|e| ServiceError::Cache {
                name: name.clone(),
                version: cache_version.clone(),
                source: e,
            })?;

        let fetched = self.fetch_manifest(tracer, &name, &version)?;
        self.fetch_file(tracer, &name, &version, &fetched.manifest)
    }

    /// Submit a package result with the flattened trace and host attributes.
    ///
    /// Submission errors are returned as-is; nothing is retried here.
    pub fn report_result(&self, tracer: &Tracer, result: &PackageResult) -> ServiceResult<()> {
        let facts = self.platform.collect().unwrap_or_else(|e| {
            debug!(error = %e, "Reporting without platform facts");
            Default::default()
        });
        let traces = tracer.flatten();

        let mut attributes = BTreeMap::new();
        attributes.insert("platformName".to_string(), facts.platform);
        attributes.insert("platformVersion".to_string(), facts.platform_version);
        attributes.insert("architecture".to_string(), facts.architecture);
        attributes.insert("instanceID".to_string(), self.instance.instance_id.clone());
        attributes.insert("instanceType".to_string(), self.instance.instance_type.clone());
        attributes.insert("region".to_string(), self.instance.region.clone());
        attributes.insert("availabilityZone".to_string(), self.instance.availability_zone.clone());
        attributes.insert(
            "trace".to_string(),
            serde_json::to_string(&traces).unwrap_or_default(),
        );

        let request = PutConfigurePackageResultRequest {
            package_name: result.package_name.clone(),
            package_version: result.version.clone(),
            previous_package_version: result.previous_version.clone(),
            operation: result.operation.to_string(),
            overall_timing: (Utc::now() - result.started_at).num_milliseconds(),
            result: if result.exit_code == 0 { "Success" } else { "Failed" }.to_string(),
            attributes,
        };

        self.client
            .put_configure_package_result(&request)
            .map_err(ServiceError::Report)?;
        debug!(package = %result.package_name, traces = traces.len(), "Reported package result");
        Ok(())
    }

    fn fetch_manifest(&self, tracer: &Tracer, name: &str, version: &str) -> ServiceResult<FetchedManifest> {
        let span = tracer.begin(format!("download manifest {} {}", name, version));
        let result = self.fetch_manifest_untraced(name, version);
        match &result {
            Ok(_) => span.end(0),
            Err(e) => span.fail(e),
        }
        result
    }

    fn fetch_manifest_untraced(&self, name: &str, version: &str) -> ServiceResult<FetchedManifest> {
        let content = self
            .archive
            .download_archive_info(name, version)
            .map_err(|e| ServiceError::ManifestDownload {
                name: name.to_string(),
                version: version.to_string(),
                source: e,
            })?;

        let manifest = parse_manifest(content.as_bytes()).map_err(|e| ServiceError::ManifestParse {
            name: name.to_string(),
            version: version.to_string(),
            source: e,
        })?;

        self.archive.set_resource(name, version, &manifest);
        let identity = self.archive.get_resource_arn(name, version);
        let manifest_version = if manifest.version.is_empty() {
            version.to_string()
        } else {
            manifest.version.clone()
        };

        let same_as_cached = match self.archive.read_manifest_from_cache(&identity, &manifest_version) {
            Ok(Some(cached)) => parse_manifest(&cached).is_ok_and(|cached| cached == manifest),
            Ok(None) => false,
            Err(e) => {
                debug!(identity = %identity, error = %e, "Cached manifest unreadable");
                false
            }
        };

        self.archive
            .write_manifest_to_cache(&identity, &manifest_version, content.as_bytes())
            .map_err(|e| ServiceError::Cache {
                name: name.to_string(),
                version: manifest_version.clone(),
                source: e,
            })?;

        info!(
            archive = self.archive.name(),
            name,
            identity = %identity,
            version = %manifest_version,
            same_as_cached,
            "Manifest downloaded"
        );

        Ok(FetchedManifest {
            identity,
            version: manifest_version,
            same_as_cached,
            manifest,
        })
    }

    /// Use the cached manifest for a concrete version, or fetch it.
    fn resolve_manifest(&self, tracer: &Tracer, name: &str, version: &str) -> ServiceResult<(String, String, Manifest)> {
        if version != LATEST_VERSION {
            let identity = self.archive.get_resource_arn(name, version);
            match self.archive.read_manifest_from_cache(&identity, version) {
                Ok(Some(bytes)) => match parse_manifest(&bytes) {
                    Ok(manifest) => {
                        debug!(identity = %identity, version, "Using cached manifest");
                        self.archive.set_resource(name, version, &manifest);
                        return Ok((identity, version.to_string(), manifest));
                    }
                    Err(e) => debug!(identity = %identity, error = %e, "Cached manifest unparseable, refetching"),
                },
                Ok(None) => debug!(identity = %identity, version, "Manifest not cached"),
                Err(e) => debug!(identity = %identity, error = %e, "Cached manifest unreadable, refetching"),
            }
        }

        let fetched = self.fetch_manifest(tracer, name, version)?;
        Ok((fetched.identity, fetched.version, fetched.manifest))
    }

    fn fetch_file(&self, tracer: &Tracer, name: &str, version: &str, manifest: &Manifest) -> ServiceResult<PathBuf> {
        let facts = self.platform.collect()?;
        let (file_name, file) = find_file(
            manifest,
            &facts.platform,
            &facts.platform_version,
            &facts.architecture,
        )
        .map_err(|e| ServiceError::Resolution {
            name: name.to_string(),
            version: version.to_string(),
            source: e,
        })?;

        let url = self
            .archive
            .get_file_download_location(file_name, file, name, version)
            .map_err(|e| ServiceError::FileLocation {
                file: file_name.to_string(),
                source: e,
            })?;

        let span = tracer.begin(format!("download artifact {}", file_name));
        match self.downloader.download(&url, file_name, file) {
            Ok(path) if path.as_os_str().is_empty() => {
                span.fail("no file produced");
                Err(ServiceError::EmptyDownload {
                    file: file_name.to_string(),
                })
            }
            Ok(path) => {
                span.end(0);
                Ok(path)
            }
            Err(e) => {
                span.fail(&e);
                Err(ServiceError::Download {
                    file: file_name.to_string(),
                    source: e,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::BirdwatcherArchive;
    use crate::cache::{ManifestCache, MemoryManifestCache};
    use crate::client::{
        ClientResult, DocumentDescription, DocumentRequest, GetDocumentResponse, GetManifestRequest,
        GetManifestResponse,
    };
    use crate::download::{DownloadError, DownloadResult};
    use crate::manifest::FileInfo;
    use crate::platform::StaticPlatformProvider;
    use crate::service::PackageOperation;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const MANIFEST: &str = r#"{
        "version": "1.0.0",
        "packageArn": "pkg",
        "packages": { "ubuntu": { "_any": { "_any": { "file": "pkg.zip" } } } },
        "files": { "pkg.zip": { "downloadLocation": "https://example.com/pkg.zip" } }
    }"#;

    #[derive(Default)]
    struct MockClient {
        manifest: String,
        gets: AtomicUsize,
        reports: Mutex<Vec<PutConfigurePackageResultRequest>>,
    }

    impl ControlPlaneClient for MockClient {
        fn get_manifest(&self, _: &GetManifestRequest) -> ClientResult<GetManifestResponse> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(GetManifestResponse {
                manifest: self.manifest.clone(),
            })
        }

        fn describe_document(&self, _: &DocumentRequest) -> ClientResult<DocumentDescription> {
            unreachable!()
        }

        fn get_document(&self, _: &DocumentRequest) -> ClientResult<GetDocumentResponse> {
            unreachable!()
        }

        fn put_configure_package_result(&self, request: &PutConfigurePackageResultRequest) -> ClientResult<()> {
            self.reports.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    /// Memory cache that counts deletions.
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryManifestCache,
        deletes: AtomicUsize,
    }

    impl ManifestCache for CountingCache {
        fn read_manifest(&self, p: &str, v: &str) -> crate::cache::CacheResult<Option<Vec<u8>>> {
            self.inner.read_manifest(p, v)
        }

        fn write_manifest(&self, p: &str, v: &str, c: &[u8]) -> crate::cache::CacheResult<()> {
            self.inner.write_manifest(p, v, c)
        }

        fn delete_manifest(&self, p: &str, v: &str) -> crate::cache::CacheResult<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_manifest(p, v)
        }
    }

    /// Downloader that replays scripted outcomes.
    struct ScriptedDownloader {
        outcomes: Mutex<VecDeque<DownloadResult<PathBuf>>>,
        calls: AtomicUsize,
    }

    impl ScriptedDownloader {
        fn new(outcomes: Vec<DownloadResult<PathBuf>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ArtifactDownloader for ScriptedDownloader {
        fn download(&self, url: &str, _: &str, _: &FileInfo) -> DownloadResult<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(DownloadError::Http {
                        url: url.to_string(),
                        reason: "no more outcomes".to_string(),
                    })
                })
        }
    }

    fn failure() -> DownloadResult<PathBuf> {
        Err(DownloadError::Status {
            url: "https://example.com/pkg.zip".to_string(),
            status: 503,
        })
    }

    struct Fixture {
        client: Arc<MockClient>,
        cache: Arc<CountingCache>,
        downloader: Arc<ScriptedDownloader>,
        service: PackageService,
    }

    fn fixture(manifest: &str, outcomes: Vec<DownloadResult<PathBuf>>) -> Fixture {
        let client = Arc::new(MockClient {
            manifest: manifest.to_string(),
            ..Default::default()
        });
        let cache = Arc::new(CountingCache::default());
        let downloader = Arc::new(ScriptedDownloader::new(outcomes));
        let archive = BirdwatcherArchive::new(Arc::clone(&client), cache.clone() as Arc<dyn ManifestCache>);
        let service = PackageService::new(
            Arc::new(archive),
            client.clone(),
            downloader.clone(),
            Arc::new(StaticPlatformProvider::from_selector("ubuntu", "22.04", "amd64")),
        );
        Fixture {
            client,
            cache,
            downloader,
            service,
        }
    }

    #[test]
    fn test_download_manifest_same_as_cached() {
        let manifest = r#"{"version":"1234","packageArn":"packagearn"}"#;
        let f = fixture(manifest, vec![]);
        f.cache.write_manifest("packagearn", "1234", manifest.as_bytes()).unwrap();

        let tracer = Tracer::new();
        let first = f.service.download_manifest(&tracer, "packagearn", "1234").unwrap();
        assert_eq!(first, ("packagearn".to_string(), "1234".to_string(), true));

        let second = f.service.download_manifest(&tracer, "packagearn", "1234").unwrap();
        assert_eq!(second, ("packagearn".to_string(), "1234".to_string(), true));
        assert_eq!(f.client.gets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_download_manifest_changed_still_writes() {
        let f = fixture(MANIFEST, vec![]);
        f.cache.write_manifest("pkg", "1.0.0", br#"{"version":"1.0.0"}"#).unwrap();

        let (_, _, same) = f.service.download_manifest(&Tracer::new(), "pkg", "1.0.0").unwrap();
        assert!(!same);
        let cached = f.cache.read_manifest("pkg", "1.0.0").unwrap().unwrap();
        assert_eq!(cached, MANIFEST.as_bytes());
    }

    #[test]
    fn test_latest_is_cached_under_concrete_version() {
        let f = fixture(MANIFEST, vec![]);
        let (identity, version, same) = f.service.download_manifest(&Tracer::new(), "pkg", "").unwrap();
        assert_eq!(identity, "pkg");
        assert_eq!(version, "1.0.0");
        assert!(!same);
        assert!(f.cache.read_manifest("pkg", "1.0.0").unwrap().is_some());
        assert!(f.cache.read_manifest("pkg", "latest").unwrap().is_none());
    }

    #[test]
    fn test_download_artifact_uses_cached_manifest() {
        let f = fixture(MANIFEST, vec![Ok(PathBuf::from("/tmp/pkg.zip"))]);
        f.cache.write_manifest("pkg", "1.0.0", MANIFEST.as_bytes()).unwrap();

        let path = f.service.download_artifact(&Tracer::new(), "pkg", "1.0.0").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/pkg.zip"));
        assert_eq!(f.client.gets.load(Ordering::SeqCst), 0);
        assert_eq!(f.cache.deletes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_download_artifact_retries_once_after_invalidating() {
        let f = fixture(MANIFEST, vec![failure(), Ok(PathBuf::from("/tmp/pkg.zip"))]);
        f.cache.write_manifest("pkg", "1.0.0", MANIFEST.as_bytes()).unwrap();

        let tracer = Tracer::new();
        let path = f.service.download_artifact(&tracer, "pkg", "1.0.0").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/pkg.zip"));
        assert_eq!(f.cache.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(f.client.gets.load(Ordering::SeqCst), 1);
        assert_eq!(f.downloader.calls.load(Ordering::SeqCst), 2);
        assert!(tracer
            .flatten()
            .iter()
            .any(|t| t.operation.starts_with("=retry download")));
    }

    #[test]
    fn test_download_artifact_second_failure_is_terminal() {
        let f = fixture(MANIFEST, vec![failure(), failure(), Ok(PathBuf::from("/never"))]);

        let err = f.service.download_artifact(&Tracer::new(), "pkg", "1.0.0").unwrap_err();
        assert!(matches!(err, ServiceError::Download { .. }));
        assert_eq!(f.downloader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.cache.deletes.load(Ordering::SeqCst), 1);
        // The refetched manifest is what remains cached.
        assert_eq!(f.client.gets.load(Ordering::SeqCst), 2);
        assert!(f.cache.read_manifest("pkg", "1.0.0").unwrap().is_some());
    }

    #[test]
    fn test_empty_path_counts_as_failure() {
        let f = fixture(MANIFEST, vec![Ok(PathBuf::new()), Ok(PathBuf::from("/tmp/pkg.zip"))]);
        let path = f.service.download_artifact(&Tracer::new(), "pkg", "latest").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/pkg.zip"));
        assert_eq!(f.cache.deletes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolution_failure_is_not_retried() {
        let manifest = r#"{"version":"1.0.0","packages":{"windows":{"_any":{"_any":{"file":"pkg.zip"}}}},"files":{"pkg.zip":{}}}"#;
        let f = fixture(manifest, vec![]);

        let err = f.service.download_artifact(&Tracer::new(), "pkg", "1.0.0").unwrap_err();
        assert!(matches!(err, ServiceError::Resolution { .. }));
        assert_eq!(f.downloader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.cache.deletes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_report_result_shape() {
        let f = fixture(MANIFEST, vec![]);
        let service = f.service.with_instance_info(InstanceInfo {
            instance_id: "i-0123".to_string(),
            region: "us-east-1".to_string(),
            ..Default::default()
        });

        let tracer = Tracer::new();
        tracer.begin("install").end(0);
        let result = PackageResult::new("pkg", "1.0.0", PackageOperation::Install)
            .with_previous_version(Some("0.9.0".to_string()))
            .with_exit_code(1);
        service.report_result(&tracer, &result).unwrap();

        let reports = f.client.reports.lock().unwrap();
        let report = &reports[0];
        assert_eq!(report.package_name, "pkg");
        assert_eq!(report.previous_package_version.as_deref(), Some("0.9.0"));
        assert_eq!(report.operation, "Install");
        assert_eq!(report.result, "Failed");
        assert_eq!(report.attributes["platformName"], "ubuntu");
        assert_eq!(report.attributes["instanceID"], "i-0123");
        assert!(report.attributes["trace"].contains(">install"));
        assert!(report.attributes["trace"].contains("<install"));
    }
}
