//! Manifest data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leaf of the selector tree: which file to install.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Key into [`Manifest::files`].
    #[serde(rename = "file", default)]
    pub file_name: String,
}

/// Download location and checksums for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    /// Algorithm name (e.g. "sha256") to lowercase hex digest.
    pub checksums: BTreeMap<String, String>,
    /// Where the artifact can be fetched from.
    pub download_location: String,
    /// Artifact size in bytes, zero when unknown.
    pub size: u64,
}

impl FileInfo {
    /// The SHA-256 digest, if the manifest carries one.
    pub fn sha256(&self) -> Option<&str> {
        self.checksums
            .iter()
            .find(|(algorithm, _)| algorithm.eq_ignore_ascii_case("sha256"))
            .map(|(_, digest)| digest.as_str())
    }
}

/// Selector tree: platform -> platform version -> architecture -> package.
pub type PackageTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, PackageInfo>>>;

/// Versioned package descriptor.
///
/// Equality is structural, which is what the "same as cached" check relies on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    /// Manifest schema version.
    pub schema_version: String,
    /// Stable identity of the package resource.
    pub package_arn: String,
    /// Package version. Compared by string equality only.
    pub version: String,
    /// Platform selector tree.
    pub packages: PackageTree,
    /// Files referenced from the selector tree.
    pub files: BTreeMap<String, FileInfo>,
}

/// Manifest parsing and resolution errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid JSON for this schema.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// No selector path matched the environment.
    #[error("no manifest found for platform {platform}, version {platform_version}, architecture {architecture}")]
    NoMatchingPackage {
        platform: String,
        platform_version: String,
        architecture: String,
    },

    /// The selected leaf names a file missing from the file table.
    #[error("file {0} is referenced by the package tree but missing from the manifest files")]
    FileNotFound(String),
}

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Parse raw manifest bytes.
pub fn parse_manifest(content: &[u8]) -> ManifestResult<Manifest> {
    Ok(serde_json::from_slice(content)?)
}
