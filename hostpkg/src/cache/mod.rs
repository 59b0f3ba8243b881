//! Manifest cache.
//!
//! Stores raw manifest bytes keyed by `(package, version)` so a package
//! operation does not refetch a manifest it has already seen. Document-backed
//! archives also keep a hash-only entry keyed by `(document, document_version)`
//! to decide cheaply whether a refetch is needed at all.
//!
//! Two backends share the [`ManifestCache`] contract:
//!
//! - [`MemoryManifestCache`] - process memory, for tests and short-lived callers
//! - [`DiskManifestCache`] - one file per entry, durable across agent restarts
//!
//! There is no eviction. Entries are keyed by an immutable version, so a stale
//! entry is never wrong, only unused.

mod disk;
mod memory;
mod r#trait;
mod types;

pub use disk::{cache_file_name, DiskManifestCache};
pub use memory::MemoryManifestCache;
pub use r#trait::ManifestCache;
pub use types::{CacheError, CacheResult};
