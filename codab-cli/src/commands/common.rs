//! Command-line overrides shared by the pipeline commands.

use std::path::PathBuf;

use clap::Args;
use codab::config::{PipelineConfig, RunSteps};

use crate::error::CliError;

/// Overrides applied on top of the config file and environment.
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigOverrides {
    /// Root of the stage directory tree
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Comma-separated ISO3 codes (or ISO3_VERSION keys) to process
    #[arg(long, value_name = "LIST")]
    pub iso3_include: Option<String>,

    /// Comma-separated ISO3 codes (or ISO3_VERSION keys) to skip
    #[arg(long, value_name = "LIST")]
    pub iso3_exclude: Option<String>,

    /// Comma-separated steps to run (e.g. EXTENDED,MATCHED_GLOBAL)
    #[arg(long, value_name = "STEPS")]
    pub run_include: Option<String>,

    /// Comma-separated steps to skip
    #[arg(long, value_name = "STEPS")]
    pub run_exclude: Option<String>,

    /// Edge-matching worker threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Edge-matching snap distance
    #[arg(long)]
    pub distance: Option<f64>,

    /// Log and continue when the geometry tool exits non-zero
    #[arg(long)]
    pub tolerate_tool_failure: bool,

    /// Only log to the log file
    #[arg(long, short)]
    pub quiet: bool,
}

impl ConfigOverrides {
    /// Apply the flags that were given.
    pub fn apply(&self, mut config: PipelineConfig) -> Result<PipelineConfig, CliError> {
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(list) = &self.iso3_include {
            config.iso3.set_include(list);
        }
        if let Some(list) = &self.iso3_exclude {
            config.iso3.set_exclude(list);
        }
        if self.run_include.is_some() || self.run_exclude.is_some() {
            let include = self
                .run_include
                .clone()
                .unwrap_or_else(|| config.steps.include_list());
            let exclude = self
                .run_exclude
                .clone()
                .unwrap_or_else(|| config.steps.exclude_list());
            let steps = RunSteps::parse(&include, &exclude)
                .map_err(|reason| CliError::Config(format!("invalid step list: {}", reason)))?;
            config = config.with_steps(steps);
        }
        if let Some(threads) = self.threads {
            if threads == 0 {
                return Err(CliError::Config("--threads must be at least 1".to_string()));
            }
            config = config.with_threads(threads);
        }
        if let Some(distance) = self.distance {
            if !(distance.is_finite() && distance >= 0.0) {
                return Err(CliError::Config("--distance must be non-negative".to_string()));
            }
            config = config.with_distance(distance);
        }
        if self.tolerate_tool_failure {
            config = config.with_tolerate_tool_failure(true);
        }
        Ok(config)
    }
}
