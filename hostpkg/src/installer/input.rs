//! Install request input and validation.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::error::ValidationError;

/// The requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageAction {
    Install,
    Uninstall,
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "Install"),
            Self::Uninstall => write!(f, "Uninstall"),
        }
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap())
}

/// Returns true if `version` is `major.minor.build`.
pub fn is_valid_version(version: &str) -> bool {
    version_pattern().is_match(version)
}

/// One configure-package request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurePackageInput {
    /// Package name or document ARN.
    pub name: String,
    /// Explicit version; `None` resolves to latest (install) or the
    /// installed version (uninstall).
    pub version: Option<String>,
    pub action: PackageAction,
    /// Fetch the artifact from this URI instead of the manifest service.
    pub source: Option<String>,
}

impl ConfigurePackageInput {
    /// An install request.
    pub fn install(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            action: PackageAction::Install,
            source: None,
        }
    }

    /// An uninstall request.
    pub fn uninstall(name: impl Into<String>) -> Self {
        Self {
            action: PackageAction::Uninstall,
            ..Self::install(name)
        }
    }

    /// Set an explicit version. Empty strings mean "not given".
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.trim().is_empty()).then(|| version.trim().to_string());
        self
    }

    /// Set a source override.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = (!source.trim().is_empty()).then(|| source.trim().to_string());
        self
    }

    /// Validate before any I/O happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if let Some(version) = &self.version {
            if !is_valid_version(version) {
                return Err(ValidationError::InvalidVersion {
                    field: "version",
                    value: version.clone(),
                });
            }
        }
        if self.source.is_some() {
            if self.action == PackageAction::Uninstall {
                return Err(ValidationError::InvalidCombination(
                    "source can only be used with install".to_string(),
                ));
            }
            if self.version.is_none() {
                return Err(ValidationError::InvalidCombination(
                    "version is required when source is given".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_pattern() {
        assert!(is_valid_version("1.0.0"));
        assert!(is_valid_version("10.20.3000"));
        assert!(!is_valid_version("1.0"));
        assert!(!is_valid_version("1.0.0-beta"));
        assert!(!is_valid_version("latest"));
        assert!(!is_valid_version(""));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            ConfigurePackageInput::install("  ").validate(),
            Err(ValidationError::MissingField("name"))
        );
    }

    #[test]
    fn test_bad_version_rejected() {
        let input = ConfigurePackageInput::install("pkg").with_version("1.x");
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidVersion { field: "version", .. })
        ));
    }

    #[test]
    fn test_uninstall_without_version_is_valid() {
        assert!(ConfigurePackageInput::uninstall("pkg").validate().is_ok());
    }

    #[test]
    fn test_blank_version_means_unset() {
        let input = ConfigurePackageInput::install("pkg").with_version(" ");
        assert_eq!(input.version, None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_source_requires_version() {
        let input = ConfigurePackageInput::install("pkg").with_source("file:///tmp/pkg.zip");
        assert!(matches!(input.validate(), Err(ValidationError::InvalidCombination(_))));
        assert!(input.with_version("1.0.0").validate().is_ok());
    }

    #[test]
    fn test_source_rejected_for_uninstall() {
        let input = ConfigurePackageInput::uninstall("pkg")
            .with_version("1.0.0")
            .with_source("file:///tmp/pkg.zip");
        assert!(input.validate().is_err());
    }
}
