//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use hostpkg::config::ConfigFileError;
use hostpkg::platform::PlatformError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to construct a collaborator (cache, client, downloader)
    Setup(String),
    /// Host platform could not be detected
    Platform(PlatformError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(_) = self {
            eprintln!();
            eprintln!("Run 'hostpkg config init' to create a configuration file, then set");
            eprintln!("'endpoint' in the [control_plane] section.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Setup(msg) => write!(f, "Failed to set up package agent: {}", msg),
            CliError::Platform(e) => write!(f, "Platform detection failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Platform(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PlatformError> for CliError {
    fn from(e: PlatformError) -> Self {
        CliError::Platform(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            CliError::Config("endpoint is not set".to_string()).to_string(),
            "Configuration error: endpoint is not set"
        );
        assert_eq!(
            CliError::Platform(PlatformError::UnsupportedOs("plan9".to_string())).to_string(),
            "Platform detection failed: unsupported operating system: plan9"
        );
    }

    #[test]
    fn test_platform_error_has_source() {
        use std::error::Error;

        let err = CliError::from(PlatformError::Undetected("no os-release".to_string()));
        assert!(err.source().is_some());
        assert!(CliError::Setup("x".to_string()).source().is_none());
    }
}
