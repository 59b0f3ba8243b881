//! Local package repository.
//!
//! Layout under the package root:
//!
//! ```text
//! {root}/{name}/installstate          which version is installed
//! {root}/{name}/{version}/{name}.json  package manifest
//! {root}/{name}/{version}/...          extracted contents
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{InstallError, InstallResult, ValidationError};
use super::validate::PackageManifest;

const INSTALL_STATE_FILE: &str = "installstate";

/// Lifecycle state recorded for a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallState {
    Installing,
    Installed,
    Uninstalling,
    Failed,
}

/// Contents of the install state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStateRecord {
    pub name: String,
    pub version: String,
    pub state: InstallState,
}

/// Directory name for a package; names may be document ARNs.
pub fn directory_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => format!("_{}", sanitized),
        _ => sanitized,
    }
}

/// Accept `version` only as a single plain directory name.
fn check_version(version: &str) -> InstallResult<()> {
    let mut components = Path::new(version).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == version
    );
    if !plain || version.contains(['/', '\\']) {
        return Err(ValidationError::InvalidPathComponent {
            field: "version",
            value: version.to_string(),
        }
        .into());
    }
    Ok(())
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> InstallError {
    let path = path.to_path_buf();
    move |source| InstallError::Io { action, path, source }
}

/// Materialized packages under a root directory.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Create a repository rooted at `root`. Nothing is created until a
    /// package is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The package root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{name}`.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join(directory_name(name))
    }

    /// `{root}/{name}/{version}`.
    ///
    /// Fails when `version` is not a single plain path component.
    pub fn version_dir(&self, name: &str, version: &str) -> InstallResult<PathBuf> {
        check_version(version)?;
        Ok(self.package_dir(name).join(version))
    }

    /// Path of the package manifest for a version.
    pub fn manifest_path(&self, name: &str, version: &str) -> InstallResult<PathBuf> {
        Ok(self
            .version_dir(name, version)?
            .join(format!("{}.json", directory_name(name))))
    }

    /// Returns true if the version's package manifest exists.
    pub fn has_manifest(&self, name: &str, version: &str) -> bool {
        self.manifest_path(name, version)
            .is_ok_and(|path| path.is_file())
    }

    /// Create the version directory.
    pub fn prepare_version_dir(&self, name: &str, version: &str) -> InstallResult<PathBuf> {
        let dir = self.version_dir(name, version)?;
        fs::create_dir_all(&dir).map_err(io_error("create", &dir))?;
        Ok(dir)
    }

    /// Read and parse a version's package manifest.
    pub fn read_manifest(&self, name: &str, version: &str) -> InstallResult<PackageManifest> {
        let path = self.manifest_path(name, version)?;
        let content = fs::read_to_string(&path).map_err(io_error("read", &path))?;
        serde_json::from_str(&content).map_err(|e| InstallError::PackageManifest {
            path,
            reason: e.to_string(),
        })
    }

    /// Write a version's package manifest.
    pub fn write_manifest(&self, name: &str, version: &str, manifest: &PackageManifest) -> InstallResult<()> {
        let path = self.manifest_path(name, version)?;
        let content = serde_json::to_string_pretty(manifest).map_err(|e| InstallError::PackageManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, content).map_err(io_error("write", &path))
    }

    /// The recorded install state, if any.
    pub fn install_state(&self, name: &str) -> InstallResult<Option<InstallStateRecord>> {
        let path = self.package_dir(name).join(INSTALL_STATE_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path)(e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| InstallError::PackageManifest {
                path,
                reason: e.to_string(),
            })
    }

    /// Record the install state for `version`.
    pub fn set_install_state(&self, name: &str, version: &str, state: InstallState) -> InstallResult<()> {
        check_version(version)?;
        let dir = self.package_dir(name);
        fs::create_dir_all(&dir).map_err(io_error("create", &dir))?;
        let record = InstallStateRecord {
            name: name.to_string(),
            version: version.to_string(),
            state,
        };
        let path = dir.join(INSTALL_STATE_FILE);
        let content = serde_json::to_string(&record).map_err(|e| InstallError::PackageManifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, content).map_err(io_error("write", &path))?;
        debug!(package = name, version, ?state, "Recorded install state");
        Ok(())
    }

    /// Versions with a directory under the package.
    pub fn versions(&self, name: &str) -> InstallResult<Vec<String>> {
        let dir = self.package_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &dir)(e)),
        };
        let mut versions: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// The installed version.
    ///
    /// The install state file is authoritative. Without one, a single
    /// version directory holding a package manifest counts as installed.
    pub fn installed_version(&self, name: &str) -> InstallResult<Option<String>> {
        if let Some(record) = self.install_state(name)? {
            return Ok(match record.state {
                InstallState::Installed | InstallState::Uninstalling => Some(record.version),
                InstallState::Installing | InstallState::Failed => None,
            });
        }
        let mut materialized: Vec<String> = self
            .versions(name)?
            .into_iter()
            .filter(|version| self.has_manifest(name, version))
            .collect();
        Ok(match materialized.len() {
            1 => materialized.pop(),
            _ => None,
        })
    }

    /// Delete a version directory, its state record, and the package
    /// directory once it is empty.
    pub fn remove_version(&self, name: &str, version: &str) -> InstallResult<()> {
        let dir = self.version_dir(name, version)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("remove", &dir)(e)),
        }

        if self
            .install_state(name)?
            .is_some_and(|record| record.version == version)
        {
            let path = self.package_dir(name).join(INSTALL_STATE_FILE);
            fs::remove_file(&path).map_err(io_error("remove", &path))?;
        }

        let package_dir = self.package_dir(name);
        let is_empty = fs::read_dir(&package_dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(&package_dir).map_err(io_error("remove", &package_dir))?;
        }

        info!(package = name, version, "Removed package version");
        Ok(())
    }
}
