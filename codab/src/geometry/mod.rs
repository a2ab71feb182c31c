//! Seam to the external geometry-processing service.
//!
//! The pipeline never touches coordinates itself. Every union, clip,
//! snap and format conversion is a call on one of two traits:
//!
//! - [`GeometryService`] - path-based vector operations (filter, select,
//!   dissolve, clip, concat, bundle)
//! - [`TopologyStore`] - the scratch store used by the edge-matcher, where
//!   each job works inside its own [`ScratchSpace`]
//!
//! [`GdalService`] implements both by shelling out to the `gdal` CLI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   extend / edge_match / clip / merge          │
//! └──────────────────────────────────────────────┘
//!                │                    │
//!                ▼                    ▼
//! ┌─────────────────────┐  ┌─────────────────────┐
//! │   GeometryService   │  │    TopologyStore    │
//! └─────────────────────┘  └─────────────────────┘
//!                │                    │
//!                └────────┬───────────┘
//!                         ▼
//! ┌──────────────────────────────────────────────┐
//! │  GdalService → ToolRunner → `gdal vector …`   │
//! └──────────────────────────────────────────────┘
//! ```

mod error;
mod gdal;
mod predicate;
mod tool;
mod topology;

pub use error::GeometryError;
pub use gdal::GdalService;
pub use predicate::{Predicate, SelectColumn};
pub use tool::{ToolCommand, ToolOutput, ToolRunner, PARQUET_OPTIONS};

use std::path::{Path, PathBuf};

use crate::model::Attributes;

/// Clip target: the reference country polygons restricted to one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSpec {
    /// Reference polygon layer (`bnda_cty.parquet`).
    pub reference: PathBuf,
    /// Value of the reference layer's `iso3cd` attribute to keep.
    pub iso3: String,
}

impl ClipSpec {
    pub fn new(reference: impl Into<PathBuf>, iso3: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            iso3: iso3.into(),
        }
    }

    /// Attribute filter applied to the reference layer.
    pub fn like_where(&self) -> String {
        format!("iso3cd='{}'", self.iso3.replace('\'', "''"))
    }
}

/// Uniquely named scratch area owned by one edge-matching job.
///
/// Every intermediate table a job creates is prefixed with `namespace`, so
/// concurrent jobs sharing one store never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchSpace {
    pub namespace: String,
    pub dir: PathBuf,
    /// Country whose reference extent bounds the job.
    pub iso3: String,
}

impl ScratchSpace {
    pub fn new(namespace: impl Into<String>, dir: impl Into<PathBuf>, iso3: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            dir: dir.into(),
            iso3: iso3.into(),
        }
    }

    /// Name of one intermediate table, e.g. `zzz_v01_admin1_parquet_02`.
    pub fn table(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }
}

/// Path-based vector operations.
///
/// Every operation reads whole layers from `input` and writes a new layer
/// to `output`; inputs are never mutated.
pub trait GeometryService: Send + Sync {
    /// Read every feature's attributes (geometry excluded).
    fn read_attributes(&self, layer: &Path) -> Result<Vec<Attributes>, GeometryError>;

    /// Number of features in a layer.
    fn feature_count(&self, layer: &Path) -> Result<usize, GeometryError> {
        Ok(self.read_attributes(layer)?.len())
    }

    /// Keep only features matching `predicate`.
    fn filter(&self, input: &Path, output: &Path, predicate: &Predicate) -> Result<(), GeometryError>;

    /// Project attribute columns; geometry is carried unchanged.
    fn select(&self, input: &Path, output: &Path, columns: &[SelectColumn]) -> Result<(), GeometryError>;

    /// Group features by `group_by` and union each group's geometry.
    fn dissolve(&self, input: &Path, output: &Path, group_by: &[String]) -> Result<(), GeometryError>;

    /// Clip to `clip`, drop non-polygonal fragments, then dissolve by `group_by`.
    fn clip_dissolve(
        &self,
        input: &Path,
        output: &Path,
        clip: &ClipSpec,
        group_by: &[String],
    ) -> Result<(), GeometryError>;

    /// Concatenate layers into one single-layer output.
    fn concat(&self, inputs: &[PathBuf], output: &Path, clean_coverage: bool) -> Result<(), GeometryError>;

    /// Package layers into one multi-layer archive.
    fn bundle(&self, inputs: &[PathBuf], archive: &Path) -> Result<(), GeometryError>;
}

/// Scratch store driving the edge-matching sub-pipeline.
pub trait TopologyStore: Send + Sync {
    /// Load polygons and keep their attributes aside, keyed by feature id.
    fn load(&self, scratch: &ScratchSpace, input: &Path) -> Result<(), GeometryError>;

    /// Derive boundary lines from the loaded polygons.
    fn derive_lines(&self, scratch: &ScratchSpace) -> Result<(), GeometryError>;

    /// Snap derived lines to the reference line layer within `distance`.
    fn snap(&self, scratch: &ScratchSpace, reference_lines: &Path, distance: f64) -> Result<(), GeometryError>;

    /// Rebuild polygons from the snapped lines and rejoin their attributes.
    fn merge_attributes(&self, scratch: &ScratchSpace) -> Result<(), GeometryError>;

    /// Total area covered by more than one result polygon.
    fn overlap_area(&self, scratch: &ScratchSpace) -> Result<f64, GeometryError>;

    /// Area of `extent` not covered by any result polygon.
    fn gap_area(&self, scratch: &ScratchSpace, extent: &ClipSpec) -> Result<f64, GeometryError>;

    /// Write the merged result to `output` under `layer_name`.
    fn export(&self, scratch: &ScratchSpace, output: &Path, layer_name: &str) -> Result<(), GeometryError>;

    /// Drop every intermediate table of the job.
    fn discard(&self, scratch: &ScratchSpace) -> Result<(), GeometryError>;
}
