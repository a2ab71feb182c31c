//! Staging of each country's full-coverage level.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::exclusion_filter;
use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::geometry::GeometryService;
use crate::pipeline::StageOutcome;
use crate::resolver::{AdminLevelResolver, ResolvedLayer};

/// Stages each country's full-coverage layer for edge-matching.
///
/// Output files are flat, `{iso3}_{version}_admin{level}.parquet`, so the
/// edge-matcher can treat each one as an independent job.
pub struct ExtensionPreprocessor<'a, S: ?Sized> {
    service: &'a S,
    staging_dir: PathBuf,
}

impl<'a, S: GeometryService + ?Sized> ExtensionPreprocessor<'a, S> {
    pub fn new(service: &'a S, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Resolve and stage every catalog entry; failures skip the entry.
    pub fn run(&self, catalog: &Catalog, resolver: &AdminLevelResolver<'_>) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        for key in catalog.keys() {
            let result = resolver
                .resolve(key)
                .and_then(|resolved| self.stage(&resolved))
                .map(|path| vec![path]);
            outcome.record(key.to_string(), result);
        }
        info!(
            staged = outcome.written.len(),
            skipped = outcome.failures.len(),
            "preprocessed extended layers"
        );
        outcome
    }

    /// Copy one resolved layer into the staging directory, dropping the
    /// country's excluded features.
    pub fn stage(&self, resolved: &ResolvedLayer) -> Result<PathBuf, PipelineError> {
        let key = &resolved.key;
        fs::create_dir_all(&self.staging_dir)?;
        let output = self.staging_dir.join(key.staged_file(resolved.resolution.level));

        match exclusion_filter(&key.iso3) {
            Some(predicate) => {
                debug!(key = %key, filter = %predicate.to_sql(), "filtering layer");
                self.service
                    .filter(&resolved.path, &output, &predicate)
                    .map_err(|e| PipelineError::external(format!("filter {}", key), e))?;
            }
            None => {
                fs::copy(&resolved.path, &output)?;
            }
        }
        Ok(output)
    }
}
