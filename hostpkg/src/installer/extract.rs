//! Artifact extraction.
//!
//! Zip, tar and gzip-compressed tar artifacts are unpacked in-process. Every
//! entry path is checked before anything is written: only plain relative
//! components are accepted, so an archive can never write outside the
//! destination directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;
use tracing::debug;

use super::error::{InstallError, InstallResult};

/// Unpacks a downloaded artifact into a directory.
pub trait Extractor: Send + Sync {
    /// Extract `archive` into the existing directory `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> InstallResult<()>;
}

/// Recognized artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
    /// Anything else is copied into place as-is.
    Plain,
}

impl ArchiveFormat {
    /// Infer the format from the file name.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar") {
            Self::Tar
        } else {
            Self::Plain
        }
    }
}

/// Extracts zip and tar artifacts with the `zip`, `tar` and `flate2` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn extract_error(archive: &Path, dest: &Path, reason: impl ToString) -> InstallError {
    InstallError::Extract {
        archive: archive.to_path_buf(),
        dest: dest.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Reduce an entry name to a path relative to the destination.
///
/// Returns an empty path for entries that name the archive root (`./`).
fn relative_entry_path(archive: &Path, entry: &Path) -> InstallResult<PathBuf> {
    let mut relative = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(InstallError::UnsafeArchiveEntry {
                    archive: archive.to_path_buf(),
                    entry: entry.display().to_string(),
                });
            }
        }
    }
    Ok(relative)
}

fn create_parent(archive: &Path, dest: &Path, path: &Path) -> InstallResult<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| extract_error(archive, dest, e)),
        None => Ok(()),
    }
}

fn unpack_tar<R: Read>(archive: &Path, reader: R, dest: &Path) -> InstallResult<()> {
    let mut tarball = tar::Archive::new(reader);
    let entries = tarball
        .entries()
        .map_err(|e| extract_error(archive, dest, e))?;

    let mut unpacked = 0usize;
    for entry in entries {
        let mut entry = entry.map_err(|e| extract_error(archive, dest, e))?;
        let entry_type = entry.header().entry_type();
        match entry_type {
            EntryType::Directory | EntryType::Regular => {}
            EntryType::XGlobalHeader | EntryType::XHeader => continue,
            other => {
                return Err(extract_error(
                    archive,
                    dest,
                    format!("unsupported entry type {:?}", other),
                ));
            }
        }

        let path = entry
            .path()
            .map_err(|e| extract_error(archive, dest, e))?
            .into_owned();
        let relative = relative_entry_path(archive, &path)?;
        if relative.as_os_str().is_empty() {
            if entry_type == EntryType::Directory {
                continue;
            }
            return Err(extract_error(archive, dest, "file entry has an empty name"));
        }

        let target = dest.join(&relative);
        if entry_type == EntryType::Directory {
            fs::create_dir_all(&target).map_err(|e| extract_error(archive, dest, e))?;
        } else {
            create_parent(archive, dest, &target)?;
            entry
                .unpack(&target)
                .map_err(|e| extract_error(archive, dest, e))?;
        }
        unpacked += 1;
    }

    debug!(archive = %archive.display(), entries = unpacked, "Unpacked tar artifact");
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> InstallResult<()> {
    let file = File::open(archive).map_err(|e| extract_error(archive, dest, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| extract_error(archive, dest, e))?;

    for index in 0..zip.len() {
        let mut file = zip
            .by_index(index)
            .map_err(|e| extract_error(archive, dest, e))?;
        let name = file.name().to_string();
        let relative = relative_entry_path(archive, Path::new(&name))?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(&relative);
        if file.is_dir() {
            fs::create_dir_all(&target).map_err(|e| extract_error(archive, dest, e))?;
            continue;
        }

        create_parent(archive, dest, &target)?;
        let mut out = File::create(&target).map_err(|e| extract_error(archive, dest, e))?;
        io::copy(&mut file, &mut out).map_err(|e| extract_error(archive, dest, e))?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| extract_error(archive, dest, e))?;
        }
    }

    debug!(archive = %archive.display(), entries = zip.len(), "Unpacked zip artifact");
    Ok(())
}

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> InstallResult<()> {
        let format = ArchiveFormat::from_path(archive);
        debug!(archive = %archive.display(), dest = %dest.display(), ?format, "Extracting artifact");

        match format {
            ArchiveFormat::Zip => unpack_zip(archive, dest),
            ArchiveFormat::TarGz => {
                let file = File::open(archive).map_err(|e| extract_error(archive, dest, e))?;
                unpack_tar(archive, GzDecoder::new(file), dest)
            }
            ArchiveFormat::Tar => {
                let file = File::open(archive).map_err(|e| extract_error(archive, dest, e))?;
                unpack_tar(archive, file, dest)
            }
            ArchiveFormat::Plain => {
                let name = archive
                    .file_name()
                    .ok_or_else(|| extract_error(archive, dest, "artifact has no file name"))?;
                fs::copy(archive, dest.join(name))
                    .map(|_| ())
                    .map_err(|e| extract_error(archive, dest, e))
            }
        }
    }
}
