//! Platform provider seam and the live-host implementation.

use std::path::PathBuf;

use super::family::{package_manager_for_family, platform_family};
use super::types::{PlatformError, PlatformFacts, PlatformResult};

/// Source of host platform facts.
pub trait PlatformProvider: Send + Sync {
    /// Collect the current platform facts.
    fn collect(&self) -> PlatformResult<PlatformFacts>;
}

/// Map Rust's target architecture names onto manifest architecture keys.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64",
        "x86" | "i386" | "i686" => "386",
        "aarch64" => "arm64",
        other => other,
    }
    .to_string()
}

/// Detects facts from the machine the agent is running on.
#[derive(Debug, Clone)]
pub struct HostPlatformProvider {
    root: PathBuf,
}

impl Default for HostPlatformProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPlatformProvider {
    /// Provider for the live root filesystem.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }

    #[cfg(target_os = "linux")]
    fn collect_os(&self) -> PlatformResult<PlatformFacts> {
        use super::linux::{detect_init_system, LinuxDetector};

        let detector = if self.root == PathBuf::from("/") {
            LinuxDetector::new()
        } else {
            LinuxDetector::with_root(&self.root)
        };
        let (platform, platform_version) = detector.detect()?;
        let family = platform_family(&platform)
            .ok_or_else(|| PlatformError::UnknownFamily(platform.clone()))?;
        let package_manager = package_manager_for_family(family)?;

        Ok(PlatformFacts {
            platform,
            platform_version,
            platform_family: family.to_string(),
            architecture: normalize_arch(std::env::consts::ARCH),
            init_system: detect_init_system(&self.root),
            package_manager: Some(package_manager.to_string()),
        })
    }

    #[cfg(target_os = "macos")]
    fn collect_os(&self) -> PlatformResult<PlatformFacts> {
        let output = std::process::Command::new("sw_vers")
            .output()
            .map_err(|e| PlatformError::Undetected(format!("sw_vers: {}", e)))?;
        let version = super::darwin::parse_sw_vers(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| PlatformError::Undetected("sw_vers gave no version".to_string()))?;

        Ok(PlatformFacts {
            platform: "darwin".to_string(),
            platform_version: version,
            platform_family: "darwin".to_string(),
            architecture: normalize_arch(std::env::consts::ARCH),
            init_system: "launchd".to_string(),
            package_manager: None,
        })
    }

    #[cfg(target_os = "windows")]
    fn collect_os(&self) -> PlatformResult<PlatformFacts> {
        let output = std::process::Command::new("cmd")
            .args(["/C", "ver"])
            .output()
            .map_err(|e| PlatformError::Undetected(format!("ver: {}", e)))?;
        let version = super::windows::parse_ver_output(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| PlatformError::Undetected("ver gave no version".to_string()))?;

        Ok(PlatformFacts {
            platform: "windows".to_string(),
            platform_version: version,
            platform_family: "windows".to_string(),
            architecture: normalize_arch(std::env::consts::ARCH),
            init_system: "windows".to_string(),
            package_manager: None,
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    fn collect_os(&self) -> PlatformResult<PlatformFacts> {
        Err(PlatformError::UnsupportedOs(std::env::consts::OS.to_string()))
    }
}

#[cfg(target_os = "linux")]
impl HostPlatformProvider {
    /// Provider reading distribution files from an alternate root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PlatformProvider for HostPlatformProvider {
    fn collect(&self) -> PlatformResult<PlatformFacts> {
        self.collect_os()
    }
}

/// Provider returning a fixed set of facts.
#[derive(Debug, Clone)]
pub struct StaticPlatformProvider {
    facts: PlatformFacts,
}

impl StaticPlatformProvider {
    /// Wrap the given facts.
    pub fn new(facts: PlatformFacts) -> Self {
        Self { facts }
    }

    /// Convenience constructor from the three selector values.
    pub fn from_selector(platform: &str, platform_version: &str, architecture: &str) -> Self {
        Self::new(PlatformFacts {
            platform: platform.to_string(),
            platform_version: platform_version.to_string(),
            platform_family: platform_family(platform).unwrap_or_default().to_string(),
            architecture: architecture.to_string(),
            ..PlatformFacts::default()
        })
    }
}

impl PlatformProvider for StaticPlatformProvider {
    fn collect(&self) -> PlatformResult<PlatformFacts> {
        Ok(self.facts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_arch() {
        assert_eq!(normalize_arch("x86_64"), "amd64");
        assert_eq!(normalize_arch("x86"), "386");
        assert_eq!(normalize_arch("aarch64"), "arm64");
        assert_eq!(normalize_arch("riscv64"), "riscv64");
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticPlatformProvider::from_selector("ubuntu", "22.04", "amd64");
        let facts = provider.collect().unwrap();
        assert_eq!(facts.platform, "ubuntu");
        assert_eq!(facts.platform_family, "debian");
        assert_eq!(facts.to_string(), "ubuntu 22.04 (debian, amd64)");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_provider_with_root() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("etc")).unwrap();
        std::fs::write(
            temp.path().join("etc/os-release"),
            "ID=debian\nVERSION_ID=\"12\"\n",
        )
        .unwrap();

        let facts = HostPlatformProvider::with_root(temp.path()).collect().unwrap();
        assert_eq!(facts.platform, "debian");
        assert_eq!(facts.platform_version, "12");
        assert_eq!(facts.platform_family, "debian");
        assert_eq!(facts.package_manager.as_deref(), Some("apt"));
        assert_eq!(facts.init_system, "sysvinit");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_provider_unknown_family() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("etc")).unwrap();
        std::fs::write(temp.path().join("etc/os-release"), "ID=plan9\nVERSION_ID=4\n").unwrap();

        let result = HostPlatformProvider::with_root(temp.path()).collect();
        assert!(matches!(result, Err(PlatformError::UnknownFamily(p)) if p == "plan9"));
    }
}
