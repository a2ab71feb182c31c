//! Hierarchy extension of staged layers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::HierarchyPlan;
use crate::catalog::remove_layer_dir;
use crate::error::PipelineError;
use crate::geometry::GeometryService;
use crate::model::{LayerKey, LevelFile};
use crate::pipeline::StageOutcome;

/// Staged `*.parquet` files of a directory, sorted by name.
pub fn staged_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Remove every staged file of `key` from `dir`; returns the removed paths.
pub fn remove_staged(dir: &Path, key: &LayerKey) -> std::io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in staged_files(dir)? {
        let staged_key = LevelFile::from_path(&path).and_then(|f| f.key());
        if staged_key.as_ref() == Some(key) {
            fs::remove_file(&path)?;
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Build the full extended hierarchy from every staged file in `input_dir`.
///
/// Each key's previous hierarchy is replaced. A consumed input is removed
/// once its hierarchy is complete; a failed one is left in place and its
/// partial hierarchy removed.
pub fn extend_staged<S: GeometryService + ?Sized>(
    service: &S,
    input_dir: &Path,
    output_dir: &Path,
) -> StageOutcome {
    let mut outcome = StageOutcome::default();
    let files = match staged_files(input_dir) {
        Ok(files) => files,
        Err(e) => {
            outcome.record(input_dir.display().to_string(), Err(e.into()));
            return outcome;
        }
    };

    for input in files {
        let unit = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((key, level)) =
            LevelFile::from_path(&input).and_then(|f| f.key().map(|k| (k, f.level)))
        else {
            warn!(file = %unit, "not a staged layer, skipping");
            continue;
        };
        let plan = HierarchyPlan::new(level);
        let result = remove_layer_dir(output_dir, &key)
            .map_err(PipelineError::from)
            .and_then(|_| {
                plan.execute(service, &input, &key, output_dir)
                    .map_err(|e| PipelineError::external(format!("extend {}", key), e))
            })
            .inspect(|_| {
                if let Err(e) = fs::remove_file(&input) {
                    warn!(file = %unit, error = %e, "cannot remove consumed input");
                }
            });
        if result.is_err() {
            if let Err(e) = remove_layer_dir(output_dir, &key) {
                warn!(key = %key, error = %e, "cannot remove partial hierarchy");
            }
        }
        outcome.record(unit, result);
    }
    info!(
        files = outcome.written.len(),
        failed = outcome.failures.len(),
        "extended hierarchies"
    );
    outcome
}
