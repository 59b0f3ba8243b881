//! Platform command - print the facts used for manifest selection.

use hostpkg::platform::{HostPlatformProvider, PlatformProvider};

use crate::error::CliError;

/// Run the platform command.
pub fn run() -> Result<(), CliError> {
    let facts = HostPlatformProvider::new().collect()?;

    println!("Platform:         {}", facts.platform);
    println!("Platform version: {}", facts.platform_version);
    println!("Platform family:  {}", facts.platform_family);
    println!("Architecture:     {}", facts.architecture);
    println!("Init system:      {}", facts.init_system);
    println!(
        "Package manager:  {}",
        facts.package_manager.as_deref().unwrap_or("(none)")
    );
    Ok(())
}
