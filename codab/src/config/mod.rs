//! Pipeline configuration.
//!
//! Configuration is layered, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`defaults`])
//! 2. `~/.codab/config.ini` ([`file`], parsed by [`parser`])
//! 3. Process environment (`ISO3_INCLUDE`, `DISTANCE`, ...) ([`env`])
//!
//! The result is an immutable [`PipelineConfig`] handed to the pipeline
//! constructor. Nothing reads the environment after that point.
//!
//! # Example
//!
//! ```
//! use codab::config::PipelineConfig;
//!
//! let config = PipelineConfig::default()
//!     .with_threads(4)
//!     .with_distance(0.0005);
//! assert_eq!(config.edge_match.threads, 4);
//! ```

pub mod defaults;
mod env;
mod file;
mod filter;
mod parser;
mod settings;
mod steps;
mod writer;

pub use defaults::*;
pub use env::{apply_env, apply_process_env};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use filter::Iso3Filter;
pub use settings::{EdgeMatchConfig, LoggingSettings, PipelineConfig, RetrySettings};
pub use steps::{RunStep, RunSteps};
pub use writer::{config_value, to_config_string};
