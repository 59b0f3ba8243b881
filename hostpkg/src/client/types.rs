//! Wire types for control-plane calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Request for a package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetManifestRequest {
    /// Package name.
    pub package_name: String,
    /// Concrete version, the `"latest"` sentinel, or empty.
    pub package_version: String,
}

/// Manifest response; the manifest arrives as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GetManifestResponse {
    /// Raw manifest JSON.
    pub manifest: String,
}

/// Request naming a document and, optionally, a version name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentRequest {
    /// Document name or ARN.
    pub name: String,
    /// Version name; `None` selects the default version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
}

/// Lifecycle status of a document.
///
/// A response without a status, or with one this client does not know,
/// decodes as `Unknown` and is never treated as active.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Metadata describing a document, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DocumentDescription {
    /// Canonical name or ARN of the document.
    pub name: String,
    /// Content hash.
    pub hash: String,
    /// Hash algorithm.
    pub hash_type: String,
    /// Document status.
    pub status: DocumentStatus,
    /// Numeric document version.
    pub document_version: String,
    /// Package version name, when set.
    pub version_name: Option<String>,
}

/// Attachment metadata returned with a document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AttachmentContent {
    /// Attachment file name, matching a manifest file key.
    pub name: String,
    /// Pre-signed download URL.
    pub url: String,
    /// Content hash.
    pub hash: String,
    /// Hash algorithm.
    pub hash_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Full document response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GetDocumentResponse {
    /// Canonical name or ARN of the document.
    pub name: String,
    /// Document status.
    pub status: DocumentStatus,
    /// Numeric document version.
    pub document_version: String,
    /// Package version name, when set.
    pub version_name: Option<String>,
    /// Document content (the package manifest).
    pub content: String,
    /// Attachment download locations.
    pub attachments_content: Vec<AttachmentContent>,
}

/// Telemetry for one package operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutConfigurePackageResultRequest {
    /// Package name.
    pub package_name: String,
    /// Version operated on.
    pub package_version: String,
    /// Version installed before the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_package_version: Option<String>,
    /// "Install" or "Uninstall".
    pub operation: String,
    /// Total duration in milliseconds.
    pub overall_timing: i64,
    /// "Success" or "Failed".
    pub result: String,
    /// Environment attributes and the encoded trace.
    pub attributes: BTreeMap<String, String>,
}
