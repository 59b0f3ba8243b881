//! Package service.
//!
//! [`PackageService`] sits between the install orchestrator and an archive
//! strategy. It fetches and caches manifests, picks the artifact for this
//! host, downloads it (retrying once against a fresh manifest), and reports
//! operation telemetry.

mod error;
mod package;
mod trace;
mod types;

pub use error::{ServiceError, ServiceResult};
pub use package::PackageService;
pub use trace::{Trace, TraceSpan, Tracer, END_MARKER, EVENT_MARKER, START_MARKER};
pub use types::{InstanceInfo, PackageOperation, PackageResult};
