//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization, and
//! pipeline creation to reduce duplication across command handlers.

use std::path::Path;

use codab::config::{apply_process_env, config_file_path, PipelineConfig};
use codab::geometry::GdalService;
use codab::logging::{init_logging, split_log_path, LoggingGuard};
use codab::pipeline::Pipeline;
use tracing::info;

use crate::commands::common::ConfigOverrides;
use crate::error::CliError;

/// Load configuration: file (or defaults), environment, then CLI overrides.
pub fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<PipelineConfig, CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    let config = PipelineConfig::load_from(&path)?;
    let config = apply_process_env(config)?;
    overrides.apply(config)
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Effective configuration
    config: PipelineConfig,
}

impl CliRunner {
    /// Load the configuration and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to read instead of `~/.codab/config.ini`
    /// * `overrides` - Command-line overrides applied last
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn new(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
        debug_mode: bool,
    ) -> Result<Self, CliError> {
        let config = load_config(config_path, overrides)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, !overrides.quiet, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the effective configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("codab v{}", codab::VERSION);
        info!("codab CLI: {} command", command);
        info!(
            data_dir = %self.config.data_dir.display(),
            gdal = %self.config.gdal_bin.display(),
            threads = self.config.edge_match.threads,
            "configuration loaded"
        );
    }

    /// Create a pipeline backed by the GDAL command-line tool.
    pub fn create_pipeline(&self) -> Pipeline<GdalService> {
        let service = GdalService::new(&self.config);
        Pipeline::new(self.config.clone(), service)
    }
}
