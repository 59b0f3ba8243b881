//! CLI command implementations.
//!
//! - [`config`] - Configuration management (init, path, show)
//! - [`package`] - Install and uninstall
//! - [`platform`] - Print the detected host platform

pub mod config;
pub mod package;
pub mod platform;
