//! hostpkg CLI - command-line front end for the package agent.

mod commands;
mod error;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use hostpkg::config::{config_file_path, ConfigFile};
use hostpkg::installer::ConfigurePackageInput;
use hostpkg::logging::init_logging;

use commands::config::ConfigCommands;
use commands::package::{InstallArgs, UninstallArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "hostpkg")]
#[command(version = hostpkg::VERSION)]
#[command(about = "Install and uninstall distributor packages on this host", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.hostpkg/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package (latest version unless --version is given)
    Install(InstallArgs),

    /// Uninstall a package (installed version unless --version is given)
    Uninstall(UninstallArgs),

    /// Show the detected host platform
    Platform,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config_file_path);

    match run(cli, config_path) {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

fn run(cli: Cli, config_path: PathBuf) -> Result<i32, CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command, &config_path).map(|_| 0),
        Commands::Platform => commands::platform::run().map(|_| 0),
        Commands::Install(args) => run_package(args.into(), &config_path, cli.verbose),
        Commands::Uninstall(args) => run_package(args.into(), &config_path, cli.verbose),
    }
}

fn run_package(input: ConfigurePackageInput, config_path: &Path, verbose: bool) -> Result<i32, CliError> {
    let config = ConfigFile::load_from(config_path)?;
    let _guard = init_logging(&config.logging.directory, &config.logging.file, verbose)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    commands::package::run(input, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from([
            "hostpkg", "install", "nginx", "--version", "1.2.3", "--source", "https://x/y.tar.gz",
        ])
        .unwrap();

        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.name, "nginx");
                assert_eq!(args.version.as_deref(), Some("1.2.3"));
                assert_eq!(args.source.as_deref(), Some("https://x/y.tar.gz"));
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_parse_uninstall_with_global_flags() {
        let cli = Cli::try_parse_from(["hostpkg", "uninstall", "nginx", "-v", "--config", "/tmp/c.ini"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
        assert!(matches!(cli.command, Commands::Uninstall(UninstallArgs { version: None, .. })));
    }

    #[test]
    fn test_install_requires_name() {
        assert!(Cli::try_parse_from(["hostpkg", "install"]).is_err());
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["hostpkg", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Init { force: true }
            }
        ));
    }
}
