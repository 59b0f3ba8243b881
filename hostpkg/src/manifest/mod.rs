//! Package manifest model and platform selection.
//!
//! A manifest describes one version of a package: a three-level selector
//! tree (platform -> platform version -> architecture) whose leaves name a
//! file, and a file table giving each file's download location and checksums.
//!
//! ```text
//! {
//!   "schemaVersion": "2.0",
//!   "packageArn": "arn:aws:ssm:::package/Example",
//!   "version": "1.2.0",
//!   "packages": { "ubuntu": { "_any": { "amd64": { "file": "example.tar.gz" } } } },
//!   "files": { "example.tar.gz": { "checksums": { "sha256": "..." }, "downloadLocation": "https://..." } }
//! }
//! ```

mod selector;
mod types;

pub use selector::{find_file, select_package, ANY_SELECTOR, NANO_SUFFIX, STAR_SELECTOR};
pub use types::{
    parse_manifest, FileInfo, Manifest, ManifestError, ManifestResult, PackageInfo, PackageTree,
};
