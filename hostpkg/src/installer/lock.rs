//! Per-package operation locks.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::error::{InstallError, InstallResult};
use super::input::PackageAction;
use super::repository::directory_name;

/// Process-wide registry of packages with an operation in flight.
///
/// Acquisition never blocks: a second request for a held package fails
/// immediately. The lock is released when the returned guard drops.
///
/// Locks are keyed by the package directory name, so two names that share
/// a directory on disk also share a lock.
#[derive(Debug, Default)]
pub struct PackageLockRegistry {
    held: DashMap<String, PackageAction>,
}

impl PackageLockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `name` for `action`, or fail if it is already held.
    pub fn try_lock(&self, name: &str, action: PackageAction) -> InstallResult<PackageLock<'_>> {
        let key = directory_name(name);
        match self.held.entry(key.clone()) {
            Entry::Occupied(entry) => Err(InstallError::Locked {
                name: name.to_string(),
                held_by: entry.get().to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(action);
                debug!(package = name, %action, "Acquired package lock");
                Ok(PackageLock {
                    registry: self,
                    name: name.to_string(),
                    key,
                })
            }
        }
    }

    /// Returns true if `name` is locked.
    pub fn is_locked(&self, name: &str) -> bool {
        self.held.contains_key(&directory_name(name))
    }
}

/// Scoped hold on a package; releases on drop.
#[derive(Debug)]
pub struct PackageLock<'r> {
    registry: &'r PackageLockRegistry,
    name: String,
    key: String,
}

impl PackageLock<'_> {
    /// The locked package name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for PackageLock<'_> {
    fn drop(&mut self) {
        self.registry.held.remove(&self.key);
        debug!(package = %self.name, "Released package lock");
    }
}
