//! Archive strategies.
//!
//! An [`Archive`] knows how to fetch a package manifest from one kind of
//! control-plane API, which identity to cache it under, and where each
//! referenced file can be downloaded from.
//!
//! Two strategies exist:
//!
//! - [`BirdwatcherArchive`] fetches manifests from the dedicated manifest
//!   distribution API. The requested name is the cache identity.
//! - [`DocumentArchive`] fetches manifests stored as versioned documents.
//!   The document's own name (an ARN for shared documents) is the cache
//!   identity, and file locations come from the document's attachments.

mod birdwatcher;
mod document;
mod error;
mod memo;
mod traits;

pub use birdwatcher::BirdwatcherArchive;
pub use document::{DocumentArchive, DEFAULT_JITTER_UNIT, MAX_JITTER_UNITS};
pub use error::{ArchiveError, ArchiveResult};
pub use traits::{resolve_version, Archive, LATEST_VERSION};
