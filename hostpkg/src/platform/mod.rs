//! Host platform detection.
//!
//! Collects the facts used to pick the right artifact out of a manifest:
//! platform name, platform version, platform family, architecture, init
//! system and package manager.
//!
//! Detection is string parsing over well-known files and command output, so
//! each parser is a pure function that can be tested against captured
//! content. [`HostPlatformProvider`] wires the parsers to the live system;
//! [`StaticPlatformProvider`] returns fixed facts.
//!
//! # Linux fallback order
//!
//! 1. `/etc/os-release`, then `/usr/lib/os-release`
//! 2. `lsb_release -a` output, then `/etc/lsb-release`
//! 3. distribution release files (`/etc/redhat-release`, `/etc/system-release`, ...)

mod darwin;
mod detector;
mod family;
mod linux;
mod types;
mod windows;

pub use darwin::parse_sw_vers;
pub use detector::{normalize_arch, HostPlatformProvider, PlatformProvider, StaticPlatformProvider};
pub use family::{package_manager_for_family, platform_family};
pub use linux::{
    detect_init_system, normalize_platform, parse_lsb_release_file, parse_lsb_release_output,
    parse_os_release, parse_release_file, LinuxDetector, OsRelease,
};
pub use types::{PlatformError, PlatformFacts, PlatformResult};
pub use windows::parse_ver_output;
