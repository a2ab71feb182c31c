//! Per-stage outcomes.

use std::path::PathBuf;

use tracing::warn;

use crate::error::PipelineError;

/// A unit of work that was skipped, with its cause.
#[derive(Debug)]
pub struct UnitFailure {
    /// Human-readable unit, e.g. `ZZZ_v01` or a file name.
    pub unit: String,
    pub error: PipelineError,
}

/// Files written and units skipped by one per-file stage.
#[derive(Debug, Default)]
pub struct StageOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<UnitFailure>,
}

impl StageOutcome {
    /// Record one unit's result, logging a failure with its context.
    pub fn record(&mut self, unit: impl Into<String>, result: Result<Vec<PathBuf>, PipelineError>) {
        let unit = unit.into();
        match result {
            Ok(paths) => self.written.extend(paths),
            Err(error) => {
                warn!(unit = %unit, error = %error, "skipping unit");
                self.failures.push(UnitFailure { unit, error });
            }
        }
    }

    pub fn absorb(&mut self, other: StageOutcome) {
        self.written.extend(other.written);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
