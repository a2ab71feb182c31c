//! Global merge of per-country layers.
//!
//! For each stage, scope and level every country's file is concatenated
//! into `global/{stage}/{scope}/admin{level}.parquet`; the per-level
//! outputs of a scope are then bundled into one multi-layer archive.
//! A scope directory is rebuilt from scratch on every merge.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::geometry::GeometryService;
use crate::model::{AdminLevel, LayerKey, ProcessingStage, VersionScope};
use crate::pipeline::StageOutcome;

/// File name of one merged level.
pub fn merged_file(level: AdminLevel) -> String {
    format!("admin{}.parquet", level)
}

/// File name of the multi-layer bundle of a stage and scope.
pub fn bundle_file(stage: ProcessingStage, scope: VersionScope) -> String {
    format!(
        "global_admin_boundaries_{}_{}.gdb.zip",
        stage.as_str(),
        scope.as_str()
    )
}

/// Keys taking part in a scope.
pub fn scope_keys(catalog: &Catalog, scope: VersionScope) -> Vec<&LayerKey> {
    match scope {
        VersionScope::Latest => catalog.latest_keys(),
        VersionScope::All => catalog.keys().collect(),
    }
}

pub struct Merger<'a, S: ?Sized> {
    service: &'a S,
    config: &'a PipelineConfig,
}

impl<'a, S: GeometryService + ?Sized> Merger<'a, S> {
    pub fn new(service: &'a S, config: &'a PipelineConfig) -> Self {
        Self { service, config }
    }

    /// Merge a stage for both scopes.
    pub fn merge_stage(&self, stage: ProcessingStage, catalog: &Catalog) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        for scope in VersionScope::BOTH {
            outcome.absorb(self.merge_scope(stage, scope, catalog));
        }
        outcome
    }

    pub fn merge_scope(
        &self,
        stage: ProcessingStage,
        scope: VersionScope,
        catalog: &Catalog,
    ) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        let dir = self.config.global_dir(stage.as_str(), scope.as_str());
        let keys = scope_keys(catalog, scope);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                outcome.record(format!("{}/{}", stage, scope), Err(e.into()));
                return outcome;
            }
        }

        let mut merged = Vec::new();
        for level in 0..=stage.max_merge_level() {
            let inputs: Vec<PathBuf> = keys
                .iter()
                .filter(|key| {
                    catalog
                        .get(key)
                        .is_some_and(|entry| entry.levels.contains(&level))
                })
                .filter_map(|key| catalog.layer_path(key, level))
                .collect();
            if inputs.is_empty() {
                debug!(%stage, %scope, level, "no layers to merge");
                continue;
            }

            let output = dir.join(merged_file(level));
            let result = self
                .service
                .concat(&inputs, &output, stage.cleans_coverage())
                .map(|()| vec![output.clone()])
                .map_err(|e| {
                    PipelineError::external(format!("merge {} {} ADM{}", stage, scope, level), e)
                });
            if result.is_ok() {
                merged.push(output);
            }
            outcome.record(format!("{}/{}/admin{}", stage, scope, level), result);
        }

        if !merged.is_empty() {
            let archive = dir.join(bundle_file(stage, scope));
            let result = self
                .service
                .bundle(&merged, &archive)
                .map(|()| vec![archive.clone()])
                .map_err(|e| PipelineError::external(format!("bundle {} {}", stage, scope), e));
            outcome.record(bundle_file(stage, scope), result);
        }

        info!(
            %stage,
            %scope,
            countries = keys.len(),
            levels = merged.len(),
            "merged global layers"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(merged_file(3), "admin3.parquet");
        assert_eq!(
            bundle_file(ProcessingStage::Matched, VersionScope::Latest),
            "global_admin_boundaries_matched_latest.gdb.zip"
        );
    }
}
