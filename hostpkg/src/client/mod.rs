//! Control-plane client.
//!
//! The archives and the package service talk to the control plane through
//! [`ControlPlaneClient`], which keeps network access out of their tests.
//! [`HttpControlPlaneClient`] is the JSON-over-HTTP implementation; every
//! call goes through a [`RetryPolicy`](crate::retry::RetryPolicy).

mod error;
mod http;
mod traits;
mod types;

pub use error::{ClientError, ClientResult};
pub use http::{HttpControlPlaneClient, DEFAULT_TIMEOUT_SECS};
pub use traits::ControlPlaneClient;
pub use types::{
    AttachmentContent, DocumentDescription, DocumentRequest, DocumentStatus, GetDocumentResponse,
    GetManifestRequest, GetManifestResponse, PutConfigurePackageResultRequest,
};
