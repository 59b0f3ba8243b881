//! hostpkg - package resolution and installation for a host management agent
//!
//! Resolves a package name and version against a control-plane manifest,
//! caches manifests locally, downloads the artifact for the detected
//! platform, and drives the install/uninstall transition on disk.
//!
//! # High-Level API
//!
//! [`installer::PackageInstaller`] is the entry point. It is assembled from
//! an [`archive::Archive`] strategy, a [`client::ControlPlaneClient`], an
//! [`download::ArtifactDownloader`] and a [`platform::PlatformProvider`]:
//!
//! ```ignore
//! use hostpkg::installer::{ConfigurePackageInput, PackageInstaller};
//! use tokio_util::sync::CancellationToken;
//!
//! let installer: PackageInstaller = build_installer(&config)?;
//! let output = installer.execute(
//!     &ConfigurePackageInput::install("agent").with_version("1.2.0"),
//!     &CancellationToken::new(),
//! );
//! println!("{}: {}", output.status, output.stdout);
//! ```

pub mod archive;
pub mod cache;
pub mod client;
pub mod config;
pub mod download;
pub mod installer;
pub mod logging;
pub mod manifest;
pub mod platform;
pub mod retry;
pub mod service;

/// Version of the hostpkg library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
