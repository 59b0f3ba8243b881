//! Configure-package orchestration.
//!
//! Takes an install or uninstall request from validated input through to an
//! aggregated [`PluginOutput`]:
//!
//! ```text
//! ConfigurePackageInput
//!     -> validate -> per-package lock
//!     -> resolve installed / target versions
//!     -> ensure package on disk (PackageService, Extractor)
//!     -> stop + uninstall old, install + start new (ActionRunner)
//!     -> report telemetry
//! ```
//!
//! Packages live under `{root}/{name}/{version}/`, with the install
//! descriptor and any action documents at the version root.

mod error;
mod extract;
mod input;
mod lock;
mod orchestrator;
mod output;
mod repository;
mod runner;
mod validate;

pub use error::{InstallError, InstallResult, ValidationError};
pub use extract::{ArchiveExtractor, ArchiveFormat, Extractor};
pub use input::{is_valid_version, ConfigurePackageInput, PackageAction};
pub use lock::{PackageLock, PackageLockRegistry};
pub use orchestrator::PackageInstaller;
pub use output::{PluginOutput, ResultStatus, REBOOT_EXIT_CODE};
pub use repository::{directory_name, InstallState, InstallStateRecord, LocalRepository};
pub use runner::{ActionRunner, PackageScript, ShellActionRunner};
pub use validate::{validate_package_manifest, PackageManifest};
