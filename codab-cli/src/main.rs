//! codab CLI - Command-line interface
//!
//! This binary drives the codab boundary pipeline.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::ConfigOverrides;
use commands::config::ConfigCommands;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "codab")]
#[command(version, about = "Reconcile COD-AB administrative boundaries into global datasets", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.codab/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled pipeline step
    Run {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Local mirror to download metadata and boundaries from
        #[arg(long, value_name = "DIR")]
        mirror: Option<PathBuf>,
    },

    /// Reconcile the metadata table with the boundaries on disk
    Check {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Show the full-coverage admin level of one layer
    Resolve {
        /// Country code, e.g. AFG
        iso3: String,

        /// Layer version, e.g. v01
        version: String,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// View and initialize configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { overrides, mirror } => commands::run::run(RunArgs {
            config: cli.config,
            overrides,
            mirror,
            debug: cli.debug,
        }),
        Commands::Check { overrides } => commands::check::run(cli.config, overrides, cli.debug),
        Commands::Resolve {
            iso3,
            version,
            overrides,
        } => commands::resolve::run(cli.config, overrides, &iso3, &version, cli.debug),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::parse_from([
            "codab",
            "run",
            "--iso3-include",
            "AFG",
            "--threads",
            "4",
            "--mirror",
            "/mnt/mirror",
        ]);
        match cli.command {
            Commands::Run { overrides, mirror } => {
                assert_eq!(overrides.iso3_include.as_deref(), Some("AFG"));
                assert_eq!(overrides.threads, Some(4));
                assert_eq!(mirror, Some(PathBuf::from("/mnt/mirror")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_resolve_parses_key() {
        let cli = Cli::parse_from(["codab", "resolve", "zzz", "v01", "--debug"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Resolve { ref iso3, .. } if iso3 == "zzz"));
    }
}
