//! JSON-over-HTTP control-plane client.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::retry::RetryPolicy;

use super::error::{ClientError, ClientResult};
use super::traits::ControlPlaneClient;
use super::types::{
    DocumentDescription, DocumentRequest, GetDocumentResponse, GetManifestRequest,
    GetManifestResponse, PutConfigurePackageResultRequest,
};

/// Default HTTP request timeout (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const TARGET_PREFIX: &str = "AmazonSSM";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Error body returned by the control plane.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: String,
    #[serde(alias = "Message")]
    message: String,
}

impl ErrorBody {
    /// Error codes may arrive namespaced (`com.amazon...#ThrottlingException`).
    fn code(&self) -> &str {
        self.kind.rsplit('#').next().unwrap_or(&self.kind)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDocumentResponse {
    document: DocumentDescription,
}

/// HTTP implementation of [`ControlPlaneClient`].
///
/// Each operation is a `POST` to the endpoint with an `X-Amz-Target` header
/// naming the operation. Request signing is left to a fronting proxy.
#[derive(Clone)]
pub struct HttpControlPlaneClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpControlPlaneClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl HttpControlPlaneClient {
    /// Create a client for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom per-call timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hostpkg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call<Req, Resp>(&self, operation: &str, request: &Req) -> ClientResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        self.retry.run(|attempt| {
            debug!(operation, attempt, endpoint = %self.endpoint, "Calling control plane");
            self.call_once(operation, request)
        })
    }

    fn call_once<Req, Resp>(&self, operation: &str, request: &Req) -> ClientResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .json(request)
            .send()
            .map_err(|e| self.transport_error(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| self.transport_error(operation, e))?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(ClientError::Service {
                operation: operation.to_string(),
                status: status.as_u16(),
                code: error.code().to_string(),
                message: error.message,
            });
        }

        // Empty bodies decode as an empty object.
        let body = if body.trim().is_empty() { "{}" } else { &body };
        serde_json::from_str(body).map_err(|e| ClientError::Decode {
            operation: operation.to_string(),
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, operation: &str, error: reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::Timeout {
                operation: operation.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ClientError::Transport {
                operation: operation.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

impl ControlPlaneClient for HttpControlPlaneClient {
    fn get_manifest(&self, request: &GetManifestRequest) -> ClientResult<GetManifestResponse> {
        self.call("GetManifest", request)
    }

    fn describe_document(&self, request: &DocumentRequest) -> ClientResult<DocumentDescription> {
        let response: DescribeDocumentResponse = self.call("DescribeDocument", request)?;
        Ok(response.document)
    }

    fn get_document(&self, request: &DocumentRequest) -> ClientResult<GetDocumentResponse> {
        self.call("GetDocument", request)
    }

    fn put_configure_package_result(
        &self,
        request: &PutConfigurePackageResultRequest,
    ) -> ClientResult<()> {
        let _: serde_json::Value = self.call("PutConfigurePackageResult", request)?;
        Ok(())
    }
}
