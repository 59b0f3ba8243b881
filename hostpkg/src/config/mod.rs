//! Agent configuration.
//!
//! Settings live in `~/.hostpkg/config.ini`:
//!
//! ```ini
//! [packages]
//! root = ~/.hostpkg/packages
//! archive = birdwatcher
//!
//! [control_plane]
//! endpoint = https://ssm.us-east-1.amazonaws.com
//! timeout = 30
//! ```
//!
//! A missing file yields [`ConfigFile::default`].

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ArchiveKind, ConfigFile, ControlPlaneSettings, InstanceSettings, LoggingSettings, PackagesSettings,
};
