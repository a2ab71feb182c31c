//! Edge-Matcher.
//!
//! Snaps each staged layer's borders to the reference international
//! boundary lines so neighbouring countries share edges. Every staged file
//! is an independent [`EdgeMatchJob`]; a [`WorkerPool`] runs them in
//! parallel against a shared [`TopologyStore`], each job inside its own
//! scratch namespace.

mod job;
mod pool;
mod validate;

pub use job::{namespace_for, EdgeMatchContext, EdgeMatchJob};
pub use pool::{JobResult, WorkerPool};
pub use validate::{check_gaps, check_overlaps};

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extend::staged_files;
use crate::geometry::TopologyStore;
use crate::model::{LayerKey, LevelFile};
use crate::pipeline::{StageOutcome, UnitFailure};

/// Matched and failed files of one edge-matching pass, sorted by file name.
#[derive(Debug, Default)]
pub struct EdgeMatchReport {
    pub matched: Vec<PathBuf>,
    pub failed: Vec<UnitFailure>,
}

impl EdgeMatchReport {
    /// Keys of the staged files that failed.
    pub fn failed_keys(&self) -> Vec<LayerKey> {
        let mut keys: Vec<LayerKey> = self
            .failed
            .iter()
            .filter_map(|failure| LevelFile::parse(&failure.unit).and_then(|f| f.key()))
            .collect();
        keys.dedup();
        keys
    }

    pub fn into_outcome(self) -> StageOutcome {
        StageOutcome {
            written: self.matched,
            failures: self.failed,
        }
    }
}

pub struct EdgeMatcher<'a, T: ?Sized> {
    store: &'a T,
    context: EdgeMatchContext,
    pool: WorkerPool,
}

impl<'a, T: TopologyStore + ?Sized> EdgeMatcher<'a, T> {
    pub fn new(store: &'a T, context: EdgeMatchContext, threads: usize) -> Self {
        Self {
            store,
            context,
            pool: WorkerPool::new(threads),
        }
    }

    pub fn from_config(store: &'a T, config: &PipelineConfig) -> Self {
        let context = EdgeMatchContext {
            reference_lines: config.reference_lines(),
            reference_polygons: config.reference_polygons(),
            scratch_dir: config.scratch_dir(),
            distance: config.edge_match.distance,
            area_epsilon: config.edge_match.area_epsilon,
        };
        Self::new(store, context, config.edge_match.threads)
    }

    /// Edge-match every staged file of `input_dir` into `output_dir`.
    ///
    /// Returns after every job has finished.
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> EdgeMatchReport {
        let mut report = EdgeMatchReport::default();
        let files = match staged_files(input_dir) {
            Ok(files) => files,
            Err(e) => {
                report.failed.push(UnitFailure {
                    unit: input_dir.display().to_string(),
                    error: e.into(),
                });
                return report;
            }
        };

        let jobs: Vec<EdgeMatchJob> = files
            .iter()
            .filter_map(|file| {
                let job = EdgeMatchJob::new(file, output_dir);
                if job.is_none() {
                    warn!(file = %file.display(), "not a staged layer, skipping");
                }
                job
            })
            .collect();
        info!(
            jobs = jobs.len(),
            threads = self.pool.threads(),
            distance = self.context.distance,
            "edge-matching"
        );

        let mut results = self
            .pool
            .run(jobs, |job| job.run(self.store, &self.context));
        results.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

        for (job, result) in results {
            let result = result.unwrap_or_else(|message| {
                Err(PipelineError::WorkerPanic {
                    job: job.name.clone(),
                    message,
                })
            });
            match result {
                Ok(path) => report.matched.push(path),
                Err(error) => {
                    warn!(job = %job.name, error = %error, "edge-matching failed");
                    report.failed.push(UnitFailure {
                        unit: job.name,
                        error,
                    });
                }
            }
        }
        info!(
            matched = report.matched.len(),
            failed = report.failed.len(),
            "edge-matching finished"
        );
        report
    }
}
