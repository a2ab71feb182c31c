//! Clip extended layers to the reference country polygons.
//!
//! Clipping the snapped layers to `bnda_cty` leaves slivers and
//! non-polygonal fragments along the cut. Fragments are dropped and
//! features sharing the full attribute key are unioned back into one.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::catalog::{remove_layer_dir, Catalog};
use crate::error::PipelineError;
use crate::geometry::{ClipSpec, GeometryService};
use crate::model::columns::level_columns;
use crate::model::{AdminLevel, LayerKey};
use crate::pipeline::StageOutcome;

pub struct Clipper<'a, S: ?Sized> {
    service: &'a S,
    reference: PathBuf,
}

impl<'a, S: GeometryService + ?Sized> Clipper<'a, S> {
    pub fn new(service: &'a S, reference: impl Into<PathBuf>) -> Self {
        Self {
            service,
            reference: reference.into(),
        }
    }

    /// Clip every level of every catalog entry into `output_dir`.
    ///
    /// Each key's previous output is removed first, so a level that fails
    /// to clip leaves no file behind.
    pub fn run(&self, catalog: &Catalog, output_dir: &Path) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        for (key, entry) in catalog.entries() {
            if let Err(e) = remove_layer_dir(output_dir, key) {
                outcome.record(key.to_string(), Err(e.into()));
                continue;
            }
            for &level in &entry.levels {
                let input = entry.dir.join(key.layer_file(level));
                let result = self
                    .clip_layer(key, level, &input, output_dir)
                    .map(|path| vec![path]);
                outcome.record(format!("{} ADM{}", key, level), result);
            }
        }
        info!(
            layers = outcome.written.len(),
            failed = outcome.failures.len(),
            "clipped to reference polygons"
        );
        outcome
    }

    pub fn clip_layer(
        &self,
        key: &LayerKey,
        level: AdminLevel,
        input: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let output = key.layer_path(output_dir, level);
        let clip = ClipSpec::new(&self.reference, &key.iso3);
        self.service
            .clip_dissolve(input, &output, &clip, &level_columns(level))
            .map_err(|e| PipelineError::external(format!("clip {} ADM{}", key, level), e))?;
        Ok(output)
    }
}
