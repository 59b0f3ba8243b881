//! Artifact download and checksum verification.
//!
//! Artifacts land in `{download_dir}/{sha256 of url}/{file name}`, so two
//! versions of the same file name never collide. When the manifest carries a
//! SHA-256 checksum the download is verified, and a mismatching file is
//! removed before the error is returned.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::manifest::FileInfo;

/// Default download timeout (10 minutes).
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

const FILE_SCHEME: &str = "file://";

/// Errors raised while downloading an artifact.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The file name cannot be used as a path component.
    #[error("invalid artifact file name '{0}'")]
    InvalidFileName(String),

    /// Connection-level failure.
    #[error("failed to download {url}: {reason}")]
    Http { url: String, reason: String },

    /// The download exceeded the client timeout.
    #[error("download of {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with an error status.
    #[error("download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Local filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The downloaded file does not match the manifest checksum.
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Result alias for downloads.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Fetches an artifact to local disk.
pub trait ArtifactDownloader: Send + Sync {
    /// Download `url` and return the local path of the file.
    ///
    /// # Arguments
    ///
    /// * `url` - Remote URL, `file://` URL, or local path
    /// * `file_name` - Name to store the artifact under
    /// * `file` - Manifest entry; its SHA-256 checksum is verified when present
    fn download(&self, url: &str, file_name: &str, file: &FileInfo) -> DownloadResult<PathBuf>;
}

impl<T: ArtifactDownloader + ?Sized> ArtifactDownloader for std::sync::Arc<T> {
    fn download(&self, url: &str, file_name: &str, file: &FileInfo) -> DownloadResult<PathBuf> {
        (**self).download(url, file_name, file)
    }
}

/// Calculate the SHA-256 checksum of a file as lowercase hex.
pub fn calculate_sha256(path: &Path) -> DownloadResult<String> {
    let io_error = |e| DownloadError::Io {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(io_error)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(io_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify `path` against `expected` (case-insensitive hex). A mismatching
/// file is deleted.
pub fn verify_sha256(path: &Path, expected: &str) -> DownloadResult<()> {
    let actual = calculate_sha256(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    let _ = fs::remove_file(path);
    Err(DownloadError::ChecksumMismatch {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        actual,
    })
}

fn url_digest(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

/// Strip any directory components from a manifest file name.
fn safe_file_name(file_name: &str) -> DownloadResult<&str> {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DownloadError::InvalidFileName(file_name.to_string()))
}

/// Local path for a `file://` URL or bare path; `None` for remote URLs.
fn local_source(url: &str) -> Option<&Path> {
    if let Some(path) = url.strip_prefix(FILE_SCHEME) {
        return Some(Path::new(path));
    }
    (!url.contains("://")).then(|| Path::new(url))
}

/// Downloads artifacts over HTTP(S), or copies them from local paths.
#[derive(Clone)]
pub struct HttpArtifactDownloader {
    client: Client,
    download_dir: PathBuf,
    timeout: Duration,
}

impl std::fmt::Debug for HttpArtifactDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpArtifactDownloader")
            .field("download_dir", &self.download_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpArtifactDownloader {
    /// Create a downloader writing under `download_dir`.
    pub fn new(download_dir: impl Into<PathBuf>) -> DownloadResult<Self> {
        Self::with_timeout(download_dir, Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS))
    }

    /// Create a downloader with a custom timeout.
    pub fn with_timeout(download_dir: impl Into<PathBuf>, timeout: Duration) -> DownloadResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hostpkg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::Build(e.to_string()))?;

        Ok(Self {
            client,
            download_dir: download_dir.into(),
            timeout,
        })
    }

    /// Root directory for downloads.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Where `url` will be stored as `file_name`.
    pub fn destination(&self, url: &str, file_name: &str) -> DownloadResult<PathBuf> {
        Ok(self
            .download_dir
            .join(url_digest(url))
            .join(safe_file_name(file_name)?))
    }

    fn fetch(&self, url: &str, dest: &Path) -> DownloadResult<u64> {
        let mut response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                DownloadError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                DownloadError::Http {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = File::create(dest).map_err(|e| DownloadError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        response.copy_to(&mut file).map_err(|e| {
            let _ = fs::remove_file(dest);
            DownloadError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

impl ArtifactDownloader for HttpArtifactDownloader {
    fn download(&self, url: &str, file_name: &str, file: &FileInfo) -> DownloadResult<PathBuf> {
        let dest = self.destination(url, file_name)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| DownloadError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let bytes = match local_source(url) {
            Some(source) => {
                debug!(source = %source.display(), dest = %dest.display(), "Copying local artifact");
                fs::copy(source, &dest).map_err(|e| DownloadError::Io {
                    path: source.to_path_buf(),
                    source: e,
                })?
            }
            None => {
                debug!(url, dest = %dest.display(), "Downloading artifact");
                self.fetch(url, &dest)?
            }
        };

        if let Some(expected) = file.sha256() {
            verify_sha256(&dest, expected)?;
        }

        info!(file = file_name, bytes, path = %dest.display(), "Artifact downloaded");
        Ok(dest)
    }
}
