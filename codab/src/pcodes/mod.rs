//! P-code Hierarchy Extractor.
//!
//! Builds the global p-code list from the merged `original/latest`
//! layers, level by level, keeping only codes whose parent was accepted
//! at a shallower level.

mod extract;
mod lengths;
mod writer;


pub use extract::{accept_level, compare_rows, is_valid_pcode, level_rows, parent_to_location};
pub use lengths::{compute_lengths, country_lengths, PcodeLengths};
pub use writer::{
    length_columns, pcode_columns, write_pcodes, LENGTHS_STEM, PCODES_ADM_1_2_STEM, PCODES_STEM,
};

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::geometry::GeometryService;
use crate::merge::merged_file;
use crate::model::{AdminLevel, MAX_LEVEL};

/// One row of the global p-code table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PcodeRow {
    /// ISO3 of the country.
    pub location: String,
    pub admin_level: AdminLevel,
    pub pcode: Option<String>,
    pub name: Option<String>,
    pub parent_pcode: Option<String>,
    pub valid_on: Option<String>,
}

/// Everything one extraction produced.
#[derive(Debug, Default)]
pub struct PcodeTables {
    pub rows: Vec<PcodeRow>,
    pub lengths: Vec<PcodeLengths>,
    pub written: Vec<PathBuf>,
}

impl PcodeTables {
    /// Row count per admin level.
    pub fn counts(&self) -> [usize; MAX_LEVEL as usize] {
        let mut counts = [0; MAX_LEVEL as usize];
        for row in &self.rows {
            if (1..=MAX_LEVEL).contains(&row.admin_level) {
                counts[row.admin_level as usize - 1] += 1;
            }
        }
        counts
    }
}

pub struct PcodeExtractor<'a, S: ?Sized> {
    service: &'a S,
    /// `global/original/latest`.
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl<'a, S: GeometryService + ?Sized> PcodeExtractor<'a, S> {
    pub fn new(service: &'a S, source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Accepted rows for levels 1-5, before the level-1 parent is replaced.
    pub fn extract(&self) -> Result<Vec<PcodeRow>, PipelineError> {
        let mut accepted = Vec::new();
        for level in 1..=MAX_LEVEL {
            let path = self.source_dir.join(merged_file(level));
            if !path.exists() {
                debug!(level, path = %path.display(), "no merged layer");
                continue;
            }
            let features = self
                .service
                .read_attributes(&path)
                .map_err(|e| PipelineError::external(format!("read p-codes ADM{}", level), e))?;
            let candidates = level_rows(level, &features);
            let offered = candidates.len();
            accepted = accept_level(accepted, candidates);
            info!(level, offered, accepted = accepted.len(), "p-codes accepted");
        }
        Ok(accepted)
    }

    /// Extract, derive lengths, and write every p-code table.
    pub fn run(&self) -> Result<PcodeTables, PipelineError> {
        let mut rows = self.extract()?;

        let admin0 = self.source_dir.join(merged_file(0));
        let countries = if admin0.exists() {
            let features = self
                .service
                .read_attributes(&admin0)
                .map_err(|e| PipelineError::external("read p-codes ADM0", e))?;
            country_lengths(&features)
        } else {
            Default::default()
        };
        let lengths = compute_lengths(&rows, &countries);
        parent_to_location(&mut rows);

        let written = write_pcodes(&self.output_dir, &rows, &lengths)?;
        info!(
            rows = rows.len(),
            countries = lengths.len(),
            "wrote p-code tables"
        );
        Ok(PcodeTables {
            rows,
            lengths,
            written,
        })
    }
}
