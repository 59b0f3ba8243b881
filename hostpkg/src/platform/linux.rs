//! Linux distribution detection.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::types::{PlatformError, PlatformResult};

/// os-release style identification, also used for lsb sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// Distribution identifier (`ID=` / `Distributor ID`).
    pub id: String,
    /// Distribution version (`VERSION_ID=` / `Release`).
    pub version_id: String,
    /// Human name (`NAME=` / `Description`).
    pub name: String,
    /// Pretty name (`PRETTY_NAME=`), falls back to `name`.
    pub pretty_name: String,
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn key_values(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), strip_quotes(value)))
    })
}

/// Parse `/etc/os-release` content.
///
/// Returns `None` when no `ID=` line is present.
pub fn parse_os_release(content: &str) -> Option<OsRelease> {
    let mut release = OsRelease::default();
    for (key, value) in key_values(content) {
        match key {
            "ID" => release.id = value.to_string(),
            "VERSION_ID" => release.version_id = value.to_string(),
            "NAME" => release.name = value.to_string(),
            "PRETTY_NAME" => release.pretty_name = value.to_string(),
            _ => {}
        }
    }
    finish(release)
}

/// Parse `/etc/lsb-release` content (`DISTRIB_*=` lines).
pub fn parse_lsb_release_file(content: &str) -> Option<OsRelease> {
    let mut release = OsRelease::default();
    for (key, value) in key_values(content) {
        match key {
            "DISTRIB_ID" => release.id = value.to_string(),
            "DISTRIB_RELEASE" => release.version_id = value.to_string(),
            "DISTRIB_DESCRIPTION" => release.name = value.to_string(),
            _ => {}
        }
    }
    finish(release)
}

/// Parse the output of `lsb_release -a` (`Key:\tvalue` lines).
pub fn parse_lsb_release_output(output: &str) -> Option<OsRelease> {
    let mut release = OsRelease::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Distributor ID" => release.id = value.to_string(),
            "Release" => release.version_id = value.to_string(),
            "Description" => release.name = value.to_string(),
            _ => {}
        }
    }
    finish(release)
}

fn finish(mut release: OsRelease) -> Option<OsRelease> {
    if release.id.is_empty() {
        return None;
    }
    if release.pretty_name.is_empty() {
        release.pretty_name = release.name.clone();
    }
    Some(release)
}

fn release_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"release\s+(\d[\w.]*)").unwrap())
}

/// Parse a distribution release file such as `/etc/redhat-release`.
///
/// The platform comes from the distribution name in the text, the version
/// from the token after `release`. Returns `(platform, version)`.
pub fn parse_release_file(content: &str) -> Option<(String, String)> {
    let line = content.lines().next()?.trim();
    let version = release_version_pattern()
        .captures(line)?
        .get(1)?
        .as_str()
        .to_string();

    let lower = line.to_lowercase();
    let platform = if lower.starts_with("centos") {
        "centos"
    } else if lower.starts_with("fedora") {
        "fedora"
    } else if lower.starts_with("red hat") {
        "redhat"
    } else if lower.starts_with("amazon linux") {
        "amazon"
    } else if lower.starts_with("oracle") {
        "oracle"
    } else if lower.starts_with("rocky") {
        "rocky"
    } else if lower.starts_with("almalinux") {
        "almalinux"
    } else {
        return None;
    };

    Some((platform.to_string(), version))
}

/// Map a distribution identifier onto the platform names used in manifests.
pub fn normalize_platform(id: &str, pretty_name: &str) -> String {
    let id = id.trim().to_lowercase();
    match id.as_str() {
        "amzn" | "amazonami" | "amazon linux" => "amazon".to_string(),
        "rhel" | "redhatenterpriseserver" | "redhatenterprise" => "redhat".to_string(),
        "ol" | "oraclelinux" | "oracleserver" => "oracle".to_string(),
        "sles" | "sles_sap" | "suse" => "suse".to_string(),
        "opensuse-leap" => "opensuseleap".to_string(),
        other if other.starts_with("opensuse") => {
            if pretty_name.contains("Leap") {
                "opensuseleap".to_string()
            } else {
                "opensuse".to_string()
            }
        }
        other => other.replace(' ', ""),
    }
}

/// Release files consulted when neither os-release nor lsb data exists.
const RELEASE_FILES: [&str; 4] = [
    "etc/system-release",
    "etc/redhat-release",
    "etc/centos-release",
    "etc/fedora-release",
];

/// Detects the distribution by reading files under a root directory.
#[derive(Debug, Clone)]
pub struct LinuxDetector {
    root: PathBuf,
    lsb_command: bool,
}

impl Default for LinuxDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxDetector {
    /// Detector for the live system (`/`, runs `lsb_release`).
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
            lsb_command: true,
        }
    }

    /// Detector reading from an alternate root. Never runs `lsb_release`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lsb_command: false,
        }
    }

    /// The filesystem root this detector reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, relative: &str) -> Option<String> {
        fs::read_to_string(self.root.join(relative)).ok()
    }

    fn from_release(release: OsRelease) -> (String, String) {
        (
            normalize_platform(&release.id, &release.pretty_name),
            release.version_id,
        )
    }

    /// Detect `(platform, platform_version)`.
    pub fn detect(&self) -> PlatformResult<(String, String)> {
        for file in ["etc/os-release", "usr/lib/os-release"] {
            if let Some(release) = self.read(file).as_deref().and_then(parse_os_release) {
                debug!(source = file, id = %release.id, "Platform from os-release");
                return Ok(Self::from_release(release));
            }
        }

        if self.lsb_command {
            if let Some(release) = run_lsb_release() {
                debug!(id = %release.id, "Platform from lsb_release");
                return Ok(Self::from_release(release));
            }
        }

        if let Some(release) = self
            .read("etc/lsb-release")
            .as_deref()
            .and_then(parse_lsb_release_file)
        {
            debug!(id = %release.id, "Platform from lsb-release file");
            return Ok(Self::from_release(release));
        }

        for file in RELEASE_FILES {
            if let Some(found) = self.read(file).as_deref().and_then(parse_release_file) {
                debug!(source = file, platform = %found.0, "Platform from release file");
                return Ok(found);
            }
        }

        Err(PlatformError::Undetected(format!(
            "no os-release, lsb or release file under {}",
            self.root.display()
        )))
    }
}

fn run_lsb_release() -> Option<OsRelease> {
    let output = Command::new("lsb_release").arg("-a").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_lsb_release_output(&String::from_utf8_lossy(&output.stdout))
}

/// Determine the init system from the filesystem under `root`.
pub fn detect_init_system(root: &Path) -> String {
    if root.join("run/systemd/system").is_dir() {
        return "systemd".to_string();
    }
    let comm = fs::read_to_string(root.join("proc/1/comm")).unwrap_or_default();
    if comm.trim() == "systemd" {
        return "systemd".to_string();
    }
    if root.join("sbin/initctl").exists() {
        return "upstart".to_string();
    }
    "sysvinit".to_string()
}
