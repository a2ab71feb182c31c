//! Fetch seam for the metadata table and source layers.
//!
//! The pipeline only needs two things from a transport: the metadata table
//! and the level files of each published country+version. A [`Fetcher`]
//! provides them; [`Downloader`] wraps every call in the configured
//! [`RetryPolicy`]. [`MirrorFetcher`] serves both from a local directory
//! laid out like the published service.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::Iso3Filter;
use crate::error::PipelineError;
use crate::model::LayerKey;
use crate::pipeline::StageOutcome;
use crate::retry::RetryPolicy;

/// Transport delivering source data into the stage tree.
///
/// Every call gets the time it may take. Failures that may succeed on
/// retry, a timeout included, must be reported as
/// [`PipelineError::TransientNetwork`].
pub trait Fetcher: Send + Sync {
    /// Write the metadata table to `dest`.
    fn fetch_metadata(&self, dest: &Path, timeout: Duration) -> Result<(), PipelineError>;

    /// Every country+version the source publishes.
    fn list_layers(&self, timeout: Duration) -> Result<Vec<LayerKey>, PipelineError>;

    /// Write every level file of `key` into `dest_dir`; returns the files.
    fn fetch_layers(
        &self,
        key: &LayerKey,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<Vec<PathBuf>, PipelineError>;
}

/// Serves a local copy of the published service.
///
/// A call that overruns its timeout is reported as transient and its
/// output removed. Expected layout: `{root}/metadata_source.csv` and
/// `{root}/cod_ab_{iso3}_{version}/{iso3}_admin{level}.parquet`.
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    root: PathBuf,
}

impl MirrorFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn unavailable(&self, operation: &str, e: io::Error) -> PipelineError {
        match e.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                PipelineError::TransientNetwork {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                }
            }
            _ => PipelineError::Io(e),
        }
    }
}

/// Fail `operation` as transient when it took longer than `timeout`.
fn within_timeout(operation: &str, started: Instant, timeout: Duration) -> Result<(), PipelineError> {
    let elapsed = started.elapsed();
    if elapsed > timeout {
        return Err(PipelineError::TransientNetwork {
            operation: operation.to_string(),
            reason: format!("timed out after {:?} (limit {:?})", elapsed, timeout),
        });
    }
    Ok(())
}

impl Fetcher for MirrorFetcher {
    fn fetch_metadata(&self, dest: &Path, timeout: Duration) -> Result<(), PipelineError> {
        let started = Instant::now();
        let source = self.root.join("metadata_source.csv");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, dest).map_err(|e| self.unavailable("metadata", e))?;
        within_timeout("metadata", started, timeout).inspect_err(|_| {
            let _ = fs::remove_file(dest);
        })
    }

    fn list_layers(&self, timeout: Duration) -> Result<Vec<LayerKey>, PipelineError> {
        let started = Instant::now();
        let catalog = Catalog::scan(&self.root).map_err(|e| self.unavailable("list layers", e))?;
        within_timeout("list layers", started, timeout)?;
        Ok(catalog.keys().cloned().collect())
    }

    fn fetch_layers(
        &self,
        key: &LayerKey,
        dest_dir: &Path,
        timeout: Duration,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let started = Instant::now();
        let catalog = Catalog::scan(&self.root).map_err(|e| self.unavailable("list layers", e))?;
        let Some(entry) = catalog.get(key) else {
            return Ok(Vec::new());
        };
        fs::create_dir_all(dest_dir)?;
        let mut written = Vec::with_capacity(entry.levels.len());
        for &level in &entry.levels {
            let name = key.layer_file(level);
            let dest = dest_dir.join(&name);
            fs::copy(entry.dir.join(&name), &dest)
                .map_err(|e| self.unavailable(&format!("layer {}", name), e))?;
            written.push(dest);
        }
        within_timeout(&format!("download {}", key), started, timeout).inspect_err(|_| {
            for path in &written {
                let _ = fs::remove_file(path);
            }
        })?;
        Ok(written)
    }
}

/// Retried downloads into the stage tree.
pub struct Downloader<'a> {
    fetcher: &'a dyn Fetcher,
    policy: RetryPolicy,
}

impl<'a> Downloader<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Download the metadata table. Failure here is fatal to the run.
    pub fn download_metadata(&self, dest: &Path) -> Result<(), PipelineError> {
        self.policy
            .run("download metadata", |attempt| {
                debug!(attempt, dest = %dest.display(), "fetching metadata table");
                self.fetcher.fetch_metadata(dest, self.policy.timeout())
            })
            .map_err(|e| PipelineError::MetadataUnavailable {
                path: dest.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Download every allowed country+version into `country/original`.
    pub fn download_boundaries(&self, stage_dir: &Path, filter: &Iso3Filter) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        let timeout = self.policy.timeout();
        let keys = match self.policy.run("list layers", |_| self.fetcher.list_layers(timeout)) {
            Ok(keys) => keys,
            Err(e) => {
                outcome.record("list layers", Err(e));
                return outcome;
            }
        };

        for key in keys.iter().filter(|key| filter.allows(key)) {
            let dest_dir = stage_dir.join(key.service_name());
            let result = self
                .policy
                .run(&format!("download {}", key), |_| {
                    self.fetcher.fetch_layers(key, &dest_dir, timeout)
                });
            outcome.record(key.to_string(), result);
        }
        info!(
            files = outcome.written.len(),
            failed = outcome.failures.len(),
            "downloaded boundaries"
        );
        outcome
    }
}
