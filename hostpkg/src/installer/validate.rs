//! Local package manifest and its validation.
//!
//! Each extracted package carries a descriptor named after the package
//! (`{name}.json`) at the root of its version directory:
//!
//! ```text
//! { "name": "agent", "version": "1.2.0", "platform": "linux",
//!   "architecture": "amd64", "install": "install.sh", "reboot": "false" }
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::input::is_valid_version;

/// Install descriptor shipped inside a package.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageManifest {
    pub name: String,
    pub platform: String,
    pub architecture: String,
    pub version: String,
    pub install: String,
    pub uninstall: String,
    /// "true" or "false"; empty means "false".
    pub reboot: String,
    pub launch: String,
}

impl PackageManifest {
    /// A minimal descriptor for packages that ship without one.
    pub fn minimal(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            reboot: "false".to_string(),
            ..Default::default()
        }
    }

    /// Whether installing this package requires a reboot. Assumes the
    /// manifest has been validated.
    pub fn reboot_required(&self) -> bool {
        parse_bool(&self.reboot).unwrap_or(false)
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Some(false),
        "true" => Some(true),
        _ => None,
    }
}

fn check_command(field: &'static str, command: &str) -> Result<(), ValidationError> {
    if command.contains('\0') {
        return Err(ValidationError::InvalidCommand {
            field,
            reason: "contains a NUL byte".to_string(),
        });
    }
    Ok(())
}

/// Validate a descriptor, naming the first offending field.
pub fn validate_package_manifest(manifest: &PackageManifest) -> Result<(), ValidationError> {
    if manifest.name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if !name_pattern().is_match(&manifest.name) {
        return Err(ValidationError::InvalidName(manifest.name.clone()));
    }
    if manifest.version.is_empty() {
        return Err(ValidationError::MissingField("version"));
    }
    if !is_valid_version(&manifest.version) {
        return Err(ValidationError::InvalidVersion {
            field: "version",
            value: manifest.version.clone(),
        });
    }
    if parse_bool(&manifest.reboot).is_none() {
        return Err(ValidationError::InvalidReboot(manifest.reboot.clone()));
    }
    check_command("install", &manifest.install)?;
    check_command("uninstall", &manifest.uninstall)?;
    check_command("launch", &manifest.launch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PackageManifest {
        PackageManifest {
            name: "agent".to_string(),
            version: "1.2.0".to_string(),
            install: "install.sh".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_manifest() {
        assert_eq!(validate_package_manifest(&valid()), Ok(()));
    }

    #[test]
    fn test_reboot_defaults_to_false() {
        let manifest = valid();
        assert!(manifest.reboot.is_empty());
        assert!(!manifest.reboot_required());

        let parsed: PackageManifest = serde_json::from_str(r#"{"name":"a","version":"1.0.0"}"#).unwrap();
        assert_eq!(validate_package_manifest(&parsed), Ok(()));
        assert!(!parsed.reboot_required());
    }

    #[test]
    fn test_reboot_true() {
        let manifest = PackageManifest {
            reboot: "True".to_string(),
            ..valid()
        };
        assert_eq!(validate_package_manifest(&manifest), Ok(()));
        assert!(manifest.reboot_required());
    }

    #[test]
    fn test_field_specific_errors() {
        let cases = [
            (
                PackageManifest { name: String::new(), ..valid() },
                ValidationError::MissingField("name"),
            ),
            (
                PackageManifest { name: "../etc".to_string(), ..valid() },
                ValidationError::InvalidName("../etc".to_string()),
            ),
            (
                PackageManifest { version: String::new(), ..valid() },
                ValidationError::MissingField("version"),
            ),
            (
                PackageManifest { version: "1.2".to_string(), ..valid() },
                ValidationError::InvalidVersion {
                    field: "version",
                    value: "1.2".to_string(),
                },
            ),
            (
                PackageManifest { reboot: "maybe".to_string(), ..valid() },
                ValidationError::InvalidReboot("maybe".to_string()),
            ),
        ];
        for (manifest, expected) in cases {
            assert_eq!(validate_package_manifest(&manifest), Err(expected));
        }
    }

    #[test]
    fn test_command_shape() {
        let manifest = PackageManifest {
            uninstall: "rm\0-rf".to_string(),
            ..valid()
        };
        assert!(matches!(
            validate_package_manifest(&manifest),
            Err(ValidationError::InvalidCommand { field: "uninstall", .. })
        ));
    }

    #[test]
    fn test_minimal_is_valid() {
        assert_eq!(validate_package_manifest(&PackageManifest::minimal("pkg", "1.0.0")), Ok(()));
    }
}
