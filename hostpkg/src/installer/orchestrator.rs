//! Install/uninstall orchestration.
//!
//! [`PackageInstaller::execute`] takes one [`ConfigurePackageInput`] through
//! validation, per-package locking, version resolution, artifact acquisition
//! and the action documents, and folds every outcome into a [`PluginOutput`].
//!
//! Install of a new version over an old one is best-effort: the old version
//! is stopped and uninstalled first, and a failure there marks the result
//! failed without preventing the new install.
//!
//! A step that exits with the reboot code ends the sequence it belongs to:
//! the remaining documents are left for the run after the reboot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::LATEST_VERSION;
use crate::download::ArtifactDownloader;
use crate::manifest::FileInfo;
use crate::service::{PackageOperation, PackageResult, PackageService, Tracer};

use super::error::{InstallError, InstallResult, ValidationError};
use super::extract::Extractor;
use super::input::{is_valid_version, ConfigurePackageInput, PackageAction};
use super::lock::PackageLockRegistry;
use super::output::{PluginOutput, ResultStatus};
use super::repository::{directory_name, InstallState, LocalRepository};
use super::runner::{ActionRunner, PackageScript};
use super::validate::{validate_package_manifest, PackageManifest};

/// Whether a sequence of action documents ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    Completed,
    Stopped,
    /// A step asked for a reboot before the last document ran.
    RebootPending,
}

/// Drives package installs and uninstalls.
pub struct PackageInstaller {
    service: Arc<PackageService>,
    repository: LocalRepository,
    extractor: Arc<dyn Extractor>,
    runner: Arc<dyn ActionRunner>,
    downloader: Arc<dyn ArtifactDownloader>,
    locks: Arc<PackageLockRegistry>,
}

impl PackageInstaller {
    /// Create an installer.
    ///
    /// # Arguments
    ///
    /// * `service` - Resolves manifests and downloads artifacts
    /// * `repository` - Local package layout
    /// * `extractor` - Unpacks artifacts into version directories
    /// * `runner` - Executes action documents
    /// * `downloader` - Fetches source overrides directly
    pub fn new(
        service: Arc<PackageService>,
        repository: LocalRepository,
        extractor: Arc<dyn Extractor>,
        runner: Arc<dyn ActionRunner>,
        downloader: Arc<dyn ArtifactDownloader>,
    ) -> Self {
        Self {
            service,
            repository,
            extractor,
            runner,
            downloader,
            locks: Arc::new(PackageLockRegistry::new()),
        }
    }

    /// Share a lock registry with other installers in the process.
    pub fn with_lock_registry(mut self, locks: Arc<PackageLockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    /// The local repository.
    pub fn repository(&self) -> &LocalRepository {
        &self.repository
    }

    /// Run one configure-package request to completion.
    pub fn execute(&self, input: &ConfigurePackageInput, cancel: &CancellationToken) -> PluginOutput {
        let mut output = PluginOutput::new();

        if let Err(e) = input.validate() {
            output.mark_failed(InstallError::from(e));
            return output;
        }

        let _lock = match self.locks.try_lock(&input.name, input.action) {
            Ok(lock) => lock,
            Err(e) => {
                warn!(package = %input.name, error = %e, "Rejected concurrent package operation");
                output.mark_failed(e);
                return output;
            }
        };

        info!(
            package = %input.name,
            action = %input.action,
            version = input.version.as_deref().unwrap_or(LATEST_VERSION),
            "Configuring package"
        );

        let tracer = Tracer::new();
        match input.action {
            PackageAction::Install => self.install(&tracer, input, cancel, &mut output),
            PackageAction::Uninstall => self.uninstall(&tracer, input, cancel, &mut output),
        }

        info!(package = %input.name, status = %output.status, exit_code = output.exit_code, "Package operation finished");
        output
    }

    fn install(&self, tracer: &Tracer, input: &ConfigurePackageInput, cancel: &CancellationToken, output: &mut PluginOutput) {
        let name = input.name.as_str();
        let installed = match self.repository.installed_version(name) {
            Ok(installed) => installed,
            Err(e) => return output.mark_failed(e),
        };

        let target = match &input.version {
            Some(version) => version.clone(),
            None => match self.resolve_latest(tracer, name) {
                Ok(version) => version,
                Err(e) => {
                    output.mark_failed(e);
                    let result = PackageResult::new(name, LATEST_VERSION, PackageOperation::Install)
                        .with_previous_version(installed);
                    return self.report(tracer, result, output);
                }
            },
        };

        if installed.as_deref() == Some(target.as_str()) {
            info!(package = name, version = %target, "Package already installed");
            output.append_output(&format!("{} {} is already installed", name, target));
            output.mark_success();
            return;
        }

        let span = tracer.begin(format!("install {} {}", name, target));
        self.install_transition(tracer, input, &target, installed.as_deref(), cancel, output);
        if output.is_failed() {
            span.fail(output.status);
        } else {
            span.end(0);
        }

        let result = PackageResult::new(name, &target, PackageOperation::Install).with_previous_version(installed);
        self.report(tracer, result, output);
    }

    fn install_transition(
        &self,
        tracer: &Tracer,
        input: &ConfigurePackageInput,
        target: &str,
        installed: Option<&str>,
        cancel: &CancellationToken,
        output: &mut PluginOutput,
    ) {
        let name = input.name.as_str();
        if cancel.is_cancelled() {
            return output.mark_cancelled();
        }

        let manifest = match self.ensure_package(tracer, name, target, input.source.as_deref()) {
            Ok(manifest) => manifest,
            Err(e) => return output.mark_failed(e),
        };

        if let Some(old) = installed {
            info!(package = name, from = old, to = target, "Replacing installed version");
            match self.uninstall_version(tracer, name, old, cancel, output) {
                Sequence::Completed => {}
                Sequence::RebootPending => {
                    info!(package = name, version = old, "Previous version requested a reboot, install deferred");
                    return;
                }
                Sequence::Stopped => {
                    if output.status == ResultStatus::Cancelled {
                        return;
                    }
                    warn!(package = name, version = old, "Uninstall of previous version failed, installing anyway");
                }
            }
        }

        if let Err(e) = self.repository.set_install_state(name, target, InstallState::Installing) {
            return output.mark_failed(e);
        }

        let dir = match self.repository.version_dir(name, target) {
            Ok(dir) => dir,
            Err(e) => return output.mark_failed(e),
        };
        let sequence = self.run_scripts(tracer, &dir, &[PackageScript::Install, PackageScript::Start], cancel, output);
        if sequence == Sequence::Stopped {
            if output.status != ResultStatus::Cancelled {
                self.record_state(name, target, InstallState::Failed);
            }
            return;
        }

        if let Err(e) = self.repository.set_install_state(name, target, InstallState::Installed) {
            return output.mark_failed(e);
        }
        if sequence == Sequence::RebootPending {
            info!(package = name, version = target, "Install requested a reboot, start deferred");
            return;
        }
        if output.is_failed() {
            return;
        }
        if manifest.reboot_required() {
            output.mark_reboot();
        } else {
            output.mark_success();
        }
    }

    fn uninstall(&self, tracer: &Tracer, input: &ConfigurePackageInput, cancel: &CancellationToken, output: &mut PluginOutput) {
        let name = input.name.as_str();
        let installed = match self.repository.installed_version(name) {
            Ok(installed) => installed,
            Err(e) => return output.mark_failed(e),
        };

        let version = match input.version.clone().or_else(|| installed.clone()) {
            Some(version) => version,
            None => match self.resolve_latest(tracer, name) {
                Ok(version) => version,
                Err(e) => {
                    output.mark_failed(e);
                    let result = PackageResult::new(name, LATEST_VERSION, PackageOperation::Uninstall);
                    return self.report(tracer, result, output);
                }
            },
        };

        if cancel.is_cancelled() {
            output.mark_cancelled();
        } else {
            let span = tracer.begin(format!("uninstall {} {}", name, version));
            match self.uninstall_version(tracer, name, &version, cancel, output) {
                Sequence::Completed => {
                    output.mark_success();
                    span.end(0);
                }
                Sequence::RebootPending => span.end(i64::from(output.exit_code)),
                Sequence::Stopped => span.fail(output.status),
            }
        }

        let result = PackageResult::new(name, &version, PackageOperation::Uninstall).with_previous_version(installed);
        self.report(tracer, result, output);
    }

    /// Stop and uninstall one version, then delete its directory.
    fn uninstall_version(
        &self,
        tracer: &Tracer,
        name: &str,
        version: &str,
        cancel: &CancellationToken,
        output: &mut PluginOutput,
    ) -> Sequence {
        if let Err(e) = self.ensure_package(tracer, name, version, None) {
            output.mark_failed(e);
            return Sequence::Stopped;
        }
        if let Err(e) = self.repository.set_install_state(name, version, InstallState::Uninstalling) {
            output.mark_failed(e);
            return Sequence::Stopped;
        }

        let dir = match self.repository.version_dir(name, version) {
            Ok(dir) => dir,
            Err(e) => {
                output.mark_failed(e);
                return Sequence::Stopped;
            }
        };
        match self.run_scripts(tracer, &dir, &[PackageScript::Stop, PackageScript::Uninstall], cancel, output) {
            Sequence::Completed => {}
            sequence => return sequence,
        }

        if let Err(e) = self.repository.remove_version(name, version) {
            output.mark_failed(e);
            return Sequence::Stopped;
        }
        Sequence::Completed
    }

    /// Make sure the version's package manifest is on disk, downloading and
    /// extracting the artifact when it is not, and return it validated.
    ///
    /// An existing manifest is trusted as-is; its artifact is not re-checked.
    fn ensure_package(
        &self,
        tracer: &Tracer,
        name: &str,
        version: &str,
        source: Option<&str>,
    ) -> InstallResult<PackageManifest> {
        if !self.repository.has_manifest(name, version) {
            let span = tracer.begin(format!("acquire {} {}", name, version));
            match self.acquire(tracer, name, version, source) {
                Ok(()) => span.end(0),
                Err(e) => {
                    span.fail(&e);
                    return Err(e);
                }
            }
        } else {
            debug!(package = name, version, "Package manifest present locally");
        }

        let manifest = self.repository.read_manifest(name, version)?;
        validate_package_manifest(&manifest)?;
        Ok(manifest)
    }

    fn acquire(&self, tracer: &Tracer, name: &str, version: &str, source: Option<&str>) -> InstallResult<()> {
        let artifact: PathBuf = match source {
            Some(url) => {
                let file_name = url
                    .rsplit(|c: char| c == '/' || c == '\\')
                    .next()
                    .unwrap_or(url);
                self.downloader
                    .download(url, file_name, &FileInfo::default())
                    .map_err(InstallError::Source)?
            }
            None => self.service.download_artifact(tracer, name, version)?,
        };

        let dest = self.repository.prepare_version_dir(name, version)?;
        self.extractor.extract(&artifact, &dest)?;

        if !self.repository.has_manifest(name, version) {
            debug!(package = name, version, "Artifact has no package manifest, writing a minimal one");
            self.repository
                .write_manifest(name, version, &PackageManifest::minimal(directory_name(name), version))?;
        }
        info!(package = name, version, dir = %dest.display(), "Package materialized");
        Ok(())
    }

    /// Run action documents in order, stopping at the first failure, at
    /// cancellation, or at a reboot request with documents still to run.
    /// Missing documents are skipped.
    fn run_scripts(
        &self,
        tracer: &Tracer,
        dir: &Path,
        scripts: &[PackageScript],
        cancel: &CancellationToken,
        output: &mut PluginOutput,
    ) -> Sequence {
        for (index, script) in scripts.iter().enumerate() {
            if cancel.is_cancelled() {
                output.mark_cancelled();
                return Sequence::Stopped;
            }

            let document = dir.join(script.file_name());
            if !document.is_file() {
                debug!(dir = %dir.display(), %script, "No action document, skipping");
                continue;
            }

            let span = tracer.begin(script.to_string());
            let step = self.runner.run_document(&document, dir);
            output.merge(&step);
            if step.status == ResultStatus::Failed {
                span.fail(step.stderr.lines().last().unwrap_or("failed"));
                return Sequence::Stopped;
            }
            span.end(i64::from(step.exit_code));
            if step.status == ResultStatus::SuccessAndReboot && index + 1 < scripts.len() {
                debug!(dir = %dir.display(), %script, "Reboot requested, remaining documents deferred");
                return Sequence::RebootPending;
            }
        }
        Sequence::Completed
    }

    fn resolve_latest(&self, tracer: &Tracer, name: &str) -> InstallResult<String> {
        let (_, version, _) = self.service.download_manifest(tracer, name, LATEST_VERSION)?;
        if !is_valid_version(&version) {
            return Err(ValidationError::InvalidVersion {
                field: "manifest version",
                value: version,
            }
            .into());
        }
        debug!(package = name, version = %version, "Resolved latest version");
        Ok(version)
    }

    fn record_state(&self, name: &str, version: &str, state: InstallState) {
        if let Err(e) = self.repository.set_install_state(name, version, state) {
            warn!(package = name, version, error = %e, "Failed to record install state");
        }
    }

    /// Submit telemetry for a non-idempotent operation. Failures are logged
    /// and do not change the outcome.
    fn report(&self, tracer: &Tracer, result: PackageResult, output: &PluginOutput) {
        let exit_code = if output.status.is_success() {
            0
        } else {
            i64::from(output.exit_code.max(1))
        };
        let result = result.with_exit_code(exit_code);
        if let Err(e) = self.service.report_result(tracer, &result) {
            warn!(package = %result.package_name, error = %e, "Failed to report package result");
        }
    }
}
