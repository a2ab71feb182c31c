//! Config command - view and initialize the configuration file.
//!
//! Values shown are the effective ones: file, then environment.

use clap::Subcommand;
use codab::config::{apply_process_env, config_file_path, config_value, to_config_string, PipelineConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., edge_match.distance)
        key: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init { force } => run_init(force),
    }
}

fn effective_config() -> Result<PipelineConfig, CliError> {
    let config = PipelineConfig::load()?;
    Ok(apply_process_env(config)?)
}

/// Get a configuration value.
fn run_get(key: &str) -> Result<(), CliError> {
    let config = effective_config()?;
    let value = config_value(&config, key).ok_or_else(|| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'codab config list' to see available keys.",
            key
        ))
    })?;
    println!("{}", value);
    Ok(())
}

/// List all configuration settings.
fn run_list() -> Result<(), CliError> {
    let config = effective_config()?;
    print!("{}", to_config_string(&config));
    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// Create the configuration file.
fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() && !force {
        println!("Configuration file already exists at {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }
    PipelineConfig::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
