//! Topology checks run on the rebuilt polygons of one job.

use tracing::debug;

use crate::error::{PipelineError, TopologyCheck};
use crate::geometry::{ClipSpec, ScratchSpace, TopologyStore};

/// Fail when result polygons overlap by more than `epsilon`.
pub fn check_overlaps<T: TopologyStore + ?Sized>(
    store: &T,
    scratch: &ScratchSpace,
    file: &str,
    epsilon: f64,
) -> Result<f64, PipelineError> {
    let area = store
        .overlap_area(scratch)
        .map_err(|e| PipelineError::external(format!("overlap check {}", file), e))?;
    judge(file, TopologyCheck::Overlaps, area, epsilon)
}

/// Fail when the result leaves more than `epsilon` of the country extent
/// uncovered.
pub fn check_gaps<T: TopologyStore + ?Sized>(
    store: &T,
    scratch: &ScratchSpace,
    extent: &ClipSpec,
    file: &str,
    epsilon: f64,
) -> Result<f64, PipelineError> {
    let area = store
        .gap_area(scratch, extent)
        .map_err(|e| PipelineError::external(format!("gap check {}", file), e))?;
    judge(file, TopologyCheck::Gaps, area, epsilon)
}

fn judge(file: &str, check: TopologyCheck, area: f64, epsilon: f64) -> Result<f64, PipelineError> {
    debug!(file, %check, area, "topology check");
    if !area.is_finite() || area > epsilon {
        return Err(PipelineError::Topology {
            file: file.to_string(),
            check,
            area,
            epsilon,
        });
    }
    Ok(area)
}
