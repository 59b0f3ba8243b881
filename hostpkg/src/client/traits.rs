//! Control-plane client trait.

use std::sync::Arc;

use super::error::ClientResult;
use super::types::{
    DocumentDescription, DocumentRequest, GetDocumentResponse, GetManifestRequest,
    GetManifestResponse, PutConfigurePackageResultRequest,
};

/// Calls made against the package control plane.
///
/// Implementations are expected to handle transport retries themselves; the
/// callers above treat every returned error as final.
pub trait ControlPlaneClient: Send + Sync {
    /// Fetch a package manifest from the manifest-distribution API.
    fn get_manifest(&self, request: &GetManifestRequest) -> ClientResult<GetManifestResponse>;

    /// Fetch document metadata without content.
    fn describe_document(&self, request: &DocumentRequest) -> ClientResult<DocumentDescription>;

    /// Fetch a document with content and attachment locations.
    fn get_document(&self, request: &DocumentRequest) -> ClientResult<GetDocumentResponse>;

    /// Submit package operation telemetry.
    fn put_configure_package_result(
        &self,
        request: &PutConfigurePackageResultRequest,
    ) -> ClientResult<()>;
}

impl<T: ControlPlaneClient + ?Sized> ControlPlaneClient for Arc<T> {
    fn get_manifest(&self, request: &GetManifestRequest) -> ClientResult<GetManifestResponse> {
        (**self).get_manifest(request)
    }

    fn describe_document(&self, request: &DocumentRequest) -> ClientResult<DocumentDescription> {
        (**self).describe_document(request)
    }

    fn get_document(&self, request: &DocumentRequest) -> ClientResult<GetDocumentResponse> {
        (**self).get_document(request)
    }

    fn put_configure_package_result(
        &self,
        request: &PutConfigurePackageResultRequest,
    ) -> ClientResult<()> {
        (**self).put_configure_package_result(request)
    }
}
