//! One edge-matching job: load, snap, rebuild, validate, export.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::validate::{check_gaps, check_overlaps};
use crate::error::PipelineError;
use crate::geometry::{ClipSpec, GeometryError, ScratchSpace, TopologyStore};
use crate::model::LevelFile;

/// Shared inputs of every edge-matching job.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMatchContext {
    pub reference_lines: PathBuf,
    pub reference_polygons: PathBuf,
    pub scratch_dir: PathBuf,
    pub distance: f64,
    pub area_epsilon: f64,
}

/// Edge-matching of one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMatchJob {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub iso3: String,
}

/// Scratch namespace of a file name: every `.` becomes `_`.
pub fn namespace_for(file_name: &str) -> String {
    file_name.replace('.', "_")
}

impl EdgeMatchJob {
    /// Job for a staged file; `None` when the name is not a staged layer.
    pub fn new(input: &Path, output_dir: &Path) -> Option<Self> {
        let parsed = LevelFile::from_path(input)?;
        let name = input.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            output: output_dir.join(&name),
            name,
            input: input.to_path_buf(),
            iso3: parsed.iso3,
        })
    }

    pub fn scratch(&self, context: &EdgeMatchContext) -> ScratchSpace {
        ScratchSpace::new(namespace_for(&self.name), &context.scratch_dir, &self.iso3)
    }

    /// Output layer name, the input file stem.
    pub fn layer(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Run the sub-pipeline. Scratch is discarded whatever the outcome;
    /// on failure the partial output is removed and the input kept. Once
    /// the output is validated the job succeeds even if the input cannot
    /// be removed.
    pub fn run<T: TopologyStore + ?Sized>(
        &self,
        store: &T,
        context: &EdgeMatchContext,
    ) -> Result<PathBuf, PipelineError> {
        let scratch = self.scratch(context);
        let result = self.match_edges(store, context, &scratch);

        if let Err(e) = store.discard(&scratch) {
            warn!(job = %self.name, error = %e, "failed to discard scratch tables");
        }

        match result {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&self.input) {
                    warn!(job = %self.name, error = %e, "cannot remove consumed input");
                }
                info!(job = %self.name, "edge-matched");
                Ok(self.output.clone())
            }
            Err(e) => {
                if self.output.exists() {
                    if let Err(remove) = fs::remove_file(&self.output) {
                        warn!(job = %self.name, error = %remove, "cannot remove partial output");
                    }
                }
                Err(e)
            }
        }
    }

    fn match_edges<T: TopologyStore + ?Sized>(
        &self,
        store: &T,
        context: &EdgeMatchContext,
        scratch: &ScratchSpace,
    ) -> Result<(), PipelineError> {
        let tool = |step: &str| {
            let context = format!("edge-match {} ({})", self.name, step);
            move |e: GeometryError| PipelineError::external(context, e)
        };

        debug!(job = %self.name, namespace = %scratch.namespace, "loading");
        store.load(scratch, &self.input).map_err(tool("load"))?;
        store.derive_lines(scratch).map_err(tool("lines"))?;
        store
            .snap(scratch, &context.reference_lines, context.distance)
            .map_err(tool("snap"))?;
        store.merge_attributes(scratch).map_err(tool("merge"))?;

        let extent = ClipSpec::new(&context.reference_polygons, &self.iso3);
        check_overlaps(store, scratch, &self.name, context.area_epsilon)?;
        check_gaps(store, scratch, &extent, &self.name, context.area_epsilon)?;

        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)?;
        }
        store
            .export(scratch, &self.output, &self.layer())
            .map_err(tool("export"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace() {
        assert_eq!(namespace_for("zzz_v01_admin1.parquet"), "zzz_v01_admin1_parquet");
    }

    #[test]
    fn test_job_from_staged_file() {
        let job = EdgeMatchJob::new(
            Path::new("data/country/extended_pre/zzz_v01_admin2.parquet"),
            Path::new("data/country/extended_post"),
        )
        .unwrap();
        assert_eq!(job.iso3, "ZZZ");
        assert_eq!(job.layer(), "zzz_v01_admin2");
        assert_eq!(
            job.output,
            PathBuf::from("data/country/extended_post/zzz_v01_admin2.parquet")
        );
        assert!(EdgeMatchJob::new(Path::new("notes.txt"), Path::new("out")).is_none());
    }

    /// Store whose export writes the output and also removes the input,
    /// so the job's own input removal fails afterwards.
    struct ConsumingStore {
        area: f64,
    }

    impl TopologyStore for ConsumingStore {
        fn load(&self, _: &ScratchSpace, _: &Path) -> Result<(), GeometryError> {
            Ok(())
        }
        fn derive_lines(&self, _: &ScratchSpace) -> Result<(), GeometryError> {
            Ok(())
        }
        fn snap(&self, _: &ScratchSpace, _: &Path, _: f64) -> Result<(), GeometryError> {
            Ok(())
        }
        fn merge_attributes(&self, _: &ScratchSpace) -> Result<(), GeometryError> {
            Ok(())
        }
        fn overlap_area(&self, _: &ScratchSpace) -> Result<f64, GeometryError> {
            Ok(self.area)
        }
        fn gap_area(&self, _: &ScratchSpace, _: &ClipSpec) -> Result<f64, GeometryError> {
            Ok(self.area)
        }
        fn export(&self, scratch: &ScratchSpace, output: &Path, _: &str) -> Result<(), GeometryError> {
            fs::write(output, b"matched")?;
            let input = scratch.dir.join("zzz_v01_admin1.parquet");
            fs::remove_file(input)?;
            Ok(())
        }
        fn discard(&self, _: &ScratchSpace) -> Result<(), GeometryError> {
            Ok(())
        }
    }

    fn setup(dir: &Path) -> (EdgeMatchJob, EdgeMatchContext) {
        let input = dir.join("zzz_v01_admin1.parquet");
        fs::write(&input, b"staged").unwrap();
        let job = EdgeMatchJob::new(&input, &dir.join("post")).unwrap();
        let context = EdgeMatchContext {
            reference_lines: dir.join("bndl.parquet"),
            reference_polygons: dir.join("bnda_cty.parquet"),
            scratch_dir: dir.to_path_buf(),
            distance: 1.0,
            area_epsilon: 1e-10,
        };
        (job, context)
    }

    #[test]
    fn test_validated_output_survives_input_removal_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (job, context) = setup(dir.path());

        let output = job.run(&ConsumingStore { area: 0.0 }, &context).unwrap();
        assert_eq!(output, dir.path().join("post/zzz_v01_admin1.parquet"));
        assert_eq!(fs::read(&output).unwrap(), b"matched");
    }

    #[test]
    fn test_unvalidated_area_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let (job, context) = setup(dir.path());

        let err = job.run(&ConsumingStore { area: f64::NAN }, &context).unwrap_err();
        assert!(matches!(err, PipelineError::Topology { .. }));
        assert!(job.input.exists());
        assert!(!job.output.exists());
    }
}
