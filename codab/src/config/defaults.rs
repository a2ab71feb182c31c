//! Default values for every configuration setting.

use std::path::PathBuf;

use super::settings::*;
use super::{Iso3Filter, RunSteps};

/// Snap tolerance of the edge-matcher, in layer units (degrees).
pub const DEFAULT_DISTANCE: f64 = 0.0002;

/// Edge-matching worker threads.
pub const DEFAULT_THREADS: usize = 1;

/// Attempts per network call, including the first.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Fixed delay between network attempts, in seconds.
pub const DEFAULT_WAIT_SECS: u64 = 10;

/// Network request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Largest area still treated as zero by topology checks.
pub const DEFAULT_AREA_EPSILON: f64 = 1e-10;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_GDAL_BIN: &str = "gdal";
pub const DEFAULT_LOG_FILE: &str = "logs/codab.log";

/// Get the number of available CPU cores.
pub fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for EdgeMatchConfig {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            threads: DEFAULT_THREADS,
            area_epsilon: DEFAULT_AREA_EPSILON,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            wait_secs: DEFAULT_WAIT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            gdal_bin: PathBuf::from(DEFAULT_GDAL_BIN),
            tolerate_tool_failure: false,
            iso3: Iso3Filter::default(),
            steps: RunSteps::default(),
            edge_match: EdgeMatchConfig::default(),
            retry: RetrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
