//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use codab::config::ConfigFileError;
use codab::error::PipelineError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// The pipeline stopped on a fatal error
    Pipeline(PipelineError),
    /// The run finished but some layers failed topology validation
    Unclean { topology_failures: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Pipeline(PipelineError::MetadataUnavailable { .. }) => {
                eprintln!();
                eprintln!("The metadata table is read from <data_dir>/metadata/metadata_source.csv.");
                eprintln!("  1. Check [paths] data_dir with: codab config get paths.data_dir");
                eprintln!("  2. Or fetch it from a local mirror: codab run --mirror <dir>");
            }
            CliError::Pipeline(PipelineError::ExternalTool { .. }) => {
                eprintln!();
                eprintln!("Geometry operations need the GDAL command-line tool (3.11 or later).");
                eprintln!("  1. Check it is installed: gdal --version");
                eprintln!("  2. Or point [paths] gdal_bin at it");
            }
            CliError::Unclean { .. } => {
                eprintln!();
                eprintln!("Failed inputs are kept in <data_dir>/country/extended_pre for inspection.");
                eprintln!("Try a larger snap distance with --distance.");
                process::exit(2)
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Pipeline(e) => write!(f, "Pipeline failed: {}", e),
            CliError::Unclean { topology_failures } => write!(
                f,
                "Run finished with {} topology failure(s)",
                topology_failures
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
