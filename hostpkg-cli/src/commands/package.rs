//! Install and uninstall commands.
//!
//! Builds the package agent from configuration, runs one configure-package
//! request and prints the result. The process exit code mirrors the result:
//! 0 on success, 3010 when a reboot was requested, otherwise the failing
//! step's code.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use hostpkg::archive::{Archive, BirdwatcherArchive, DocumentArchive};
use hostpkg::cache::{DiskManifestCache, ManifestCache};
use hostpkg::client::HttpControlPlaneClient;
use hostpkg::config::{ArchiveKind, ConfigFile};
use hostpkg::download::{ArtifactDownloader, HttpArtifactDownloader};
use hostpkg::installer::{
    ArchiveExtractor, ConfigurePackageInput, LocalRepository, PackageInstaller, PluginOutput,
    ShellActionRunner,
};
use hostpkg::platform::HostPlatformProvider;
use hostpkg::retry::RetryPolicy;
use hostpkg::service::PackageService;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

/// Arguments for `install`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Package name or document ARN
    pub name: String,

    /// Version to install (default: latest)
    #[arg(long)]
    pub version: Option<String>,

    /// Fetch the artifact from this URL instead of the manifest
    #[arg(long)]
    pub source: Option<String>,
}

/// Arguments for `uninstall`.
#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Package name or document ARN
    pub name: String,

    /// Version to remove (default: the installed version)
    #[arg(long)]
    pub version: Option<String>,
}

impl From<InstallArgs> for ConfigurePackageInput {
    fn from(args: InstallArgs) -> Self {
        let mut input = ConfigurePackageInput::install(args.name);
        if let Some(version) = args.version {
            input = input.with_version(version);
        }
        if let Some(source) = args.source {
            input = input.with_source(source);
        }
        input
    }
}

impl From<UninstallArgs> for ConfigurePackageInput {
    fn from(args: UninstallArgs) -> Self {
        let input = ConfigurePackageInput::uninstall(args.name);
        match args.version {
            Some(version) => input.with_version(version),
            None => input,
        }
    }
}

/// Run an install or uninstall and return the process exit code.
pub fn run(input: ConfigurePackageInput, config: &ConfigFile) -> Result<i32, CliError> {
    let installer = build_installer(config)?;
    info!(package = %input.name, action = %input.action, "Starting package operation");

    let output = installer.execute(&input, &CancellationToken::new());
    print_output(&output);
    Ok(output.exit_code)
}

/// Wire the package agent from configuration.
pub fn build_installer(config: &ConfigFile) -> Result<PackageInstaller, CliError> {
    let endpoint = config
        .control_plane
        .endpoint
        .as_deref()
        .ok_or_else(|| CliError::Config("control-plane endpoint is not set".to_string()))?;

    let retry = RetryPolicy::new().with_max_attempts(config.control_plane.max_retries.saturating_add(1));
    let client = Arc::new(
        HttpControlPlaneClient::with_timeout(endpoint, Duration::from_secs(config.control_plane.timeout))
            .map_err(|e| CliError::Setup(e.to_string()))?
            .with_retry_policy(retry),
    );

    let cache: Arc<dyn ManifestCache> = Arc::new(
        DiskManifestCache::new(&config.packages.cache_dir).map_err(|e| CliError::Setup(e.to_string()))?,
    );

    let archive: Arc<dyn Archive> = match config.packages.archive {
        ArchiveKind::Birdwatcher => Arc::new(BirdwatcherArchive::new(Arc::clone(&client), cache)),
        ArchiveKind::Document => Arc::new(DocumentArchive::new(Arc::clone(&client), cache)),
    };

    let downloader: Arc<dyn ArtifactDownloader> = Arc::new(
        HttpArtifactDownloader::new(&config.packages.download_dir)
            .map_err(|e| CliError::Setup(e.to_string()))?,
    );

    let service = PackageService::new(
        archive,
        client,
        Arc::clone(&downloader),
        Arc::new(HostPlatformProvider::new()),
    )
    .with_instance_info(config.instance.instance_info());

    Ok(PackageInstaller::new(
        Arc::new(service),
        LocalRepository::new(&config.packages.root),
        Arc::new(ArchiveExtractor::new()),
        Arc::new(ShellActionRunner::new()),
        downloader,
    ))
}

fn print_output(output: &PluginOutput) {
    if !output.stdout.is_empty() {
        println!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        eprintln!("{}", output.stderr);
    }
    println!("Status: {} (exit code {})", output.status, output.exit_code);
}
