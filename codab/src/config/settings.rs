//! Configuration structs.

use std::path::PathBuf;
use std::time::Duration;

use super::{Iso3Filter, RunSteps};

/// Complete, immutable configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Root of the stage directory tree.
    pub data_dir: PathBuf,
    /// Geometry tool executable.
    pub gdal_bin: PathBuf,
    /// Log and continue when the geometry tool exits non-zero.
    pub tolerate_tool_failure: bool,
    pub iso3: Iso3Filter,
    pub steps: RunSteps,
    pub edge_match: EdgeMatchConfig,
    pub retry: RetrySettings,
    pub logging: LoggingSettings,
}

/// Edge-matcher tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMatchConfig {
    /// Snap tolerance.
    pub distance: f64,
    /// Worker pool size.
    pub threads: usize,
    /// Overlap/gap area treated as zero.
    pub area_epsilon: f64,
}

/// Network retry tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub attempts: u32,
    pub wait_secs: u64,
    pub timeout_secs: u64,
}

impl RetrySettings {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

impl PipelineConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.edge_match.threads = threads.max(1);
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.edge_match.distance = distance;
        self
    }

    pub fn with_iso3(mut self, filter: Iso3Filter) -> Self {
        self.iso3 = filter;
        self
    }

    pub fn with_steps(mut self, steps: RunSteps) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_tolerate_tool_failure(mut self, tolerate: bool) -> Self {
        self.tolerate_tool_failure = tolerate;
        self
    }

    /// `country/{stage}` directory.
    pub fn country_dir(&self, stage: &str) -> PathBuf {
        self.data_dir.join("country").join(stage)
    }

    /// `global/{stage}/{scope}` directory.
    pub fn global_dir(&self, stage: &str, scope: &str) -> PathBuf {
        self.data_dir.join("global").join(stage).join(scope)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.data_dir.join("metadata")
    }

    /// Metadata table as delivered by the fetcher.
    pub fn metadata_source(&self) -> PathBuf {
        self.metadata_dir().join("metadata_source.csv")
    }

    pub fn pcodes_dir(&self) -> PathBuf {
        self.data_dir.join("pcodes")
    }

    /// Reference country polygons used for clipping and gap checks.
    pub fn reference_polygons(&self) -> PathBuf {
        self.data_dir.join("bnda_cty.parquet")
    }

    /// Reference international boundary lines used for snapping.
    pub fn reference_lines(&self) -> PathBuf {
        self.data_dir.join("bndl.parquet")
    }

    /// Scratch root for edge-matching jobs.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.edge_match.distance, DEFAULT_DISTANCE);
        assert_eq!(config.edge_match.threads, 1);
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.wait(), Duration::from_secs(10));
        assert_eq!(config.retry.timeout(), Duration::from_secs(60));
        assert!(!config.tolerate_tool_failure);
    }

    #[test]
    fn test_builder_clamps_threads() {
        let config = PipelineConfig::default().with_threads(0);
        assert_eq!(config.edge_match.threads, 1);
    }

    #[test]
    fn test_directory_layout() {
        let config = PipelineConfig::default().with_data_dir("/srv/codab");
        assert_eq!(
            config.country_dir("extended"),
            PathBuf::from("/srv/codab/country/extended")
        );
        assert_eq!(
            config.global_dir("matched", "latest"),
            PathBuf::from("/srv/codab/global/matched/latest")
        );
        assert_eq!(
            config.metadata_source(),
            PathBuf::from("/srv/codab/metadata/metadata_source.csv")
        );
    }
}
