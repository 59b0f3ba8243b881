//! Fixed lookup tables from platform to family and from family to package
//! manager.

use super::types::{PlatformError, PlatformResult};

/// Platform family for a normalized platform name.
pub fn platform_family(platform: &str) -> Option<&'static str> {
    let family = match platform {
        "ubuntu" | "debian" | "raspbian" | "linuxmint" => "debian",
        "amazon" | "centos" | "redhat" | "oracle" | "rocky" | "almalinux" | "scientific" => "rhel",
        "fedora" => "fedora",
        "suse" | "sles" | "opensuse" | "opensuseleap" => "suse",
        "gentoo" => "gentoo",
        "arch" | "manjaro" => "arch",
        "alpine" => "alpine",
        "darwin" => "darwin",
        "windows" => "windows",
        _ => return None,
    };
    Some(family)
}

/// Native package manager for a platform family.
///
/// Unknown families are an error rather than a default guess.
pub fn package_manager_for_family(family: &str) -> PlatformResult<&'static str> {
    match family {
        "debian" => Ok("apt"),
        "rhel" => Ok("yum"),
        "fedora" => Ok("dnf"),
        "suse" => Ok("zypper"),
        "gentoo" => Ok("emerge"),
        "arch" => Ok("pacman"),
        "alpine" => Ok("apk"),
        other => Err(PlatformError::UnknownPackageManager(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        assert_eq!(platform_family("ubuntu"), Some("debian"));
        assert_eq!(platform_family("amazon"), Some("rhel"));
        assert_eq!(platform_family("centos"), Some("rhel"));
        assert_eq!(platform_family("fedora"), Some("fedora"));
        assert_eq!(platform_family("opensuseleap"), Some("suse"));
        assert_eq!(platform_family("alpine"), Some("alpine"));
        assert_eq!(platform_family("plan9"), None);
    }

    #[test]
    fn test_package_managers() {
        assert_eq!(package_manager_for_family("debian").unwrap(), "apt");
        assert_eq!(package_manager_for_family("rhel").unwrap(), "yum");
        assert_eq!(package_manager_for_family("fedora").unwrap(), "dnf");
        assert_eq!(package_manager_for_family("suse").unwrap(), "zypper");
        assert_eq!(package_manager_for_family("gentoo").unwrap(), "emerge");
        assert_eq!(package_manager_for_family("arch").unwrap(), "pacman");
        assert_eq!(package_manager_for_family("alpine").unwrap(), "apk");
    }

    #[test]
    fn test_unknown_family_is_error() {
        assert!(matches!(
            package_manager_for_family("beos"),
            Err(PlatformError::UnknownPackageManager(f)) if f == "beos"
        ));
        assert!(package_manager_for_family("darwin").is_err());
    }
}
