//! Config command - manage the configuration file.

use std::path::Path;

use clap::Subcommand;
use hostpkg::config::ConfigFile;

use crate::error::CliError;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,
}

/// Run the config command.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(path, force),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(path),
    }
}

fn run_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(path)?;
    let endpoint = config.control_plane.endpoint.as_deref().unwrap_or("(not set)");

    println!("[packages]");
    println!("  root = {}", config.packages.root.display());
    println!("  cache_dir = {}", config.packages.cache_dir.display());
    println!("  download_dir = {}", config.packages.download_dir.display());
    println!("  archive = {}", config.packages.archive);
    println!();
    println!("[control_plane]");
    println!("  endpoint = {}", endpoint);
    println!("  timeout = {}", config.control_plane.timeout);
    println!("  max_retries = {}", config.control_plane.max_retries);
    println!();
    println!("[logging]");
    println!("  directory = {}", config.logging.directory.display());
    println!("  file = {}", config.logging.file);
    Ok(())
}
