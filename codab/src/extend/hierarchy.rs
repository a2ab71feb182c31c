//! Hierarchy synthesis: derive levels 0-4 from one full-coverage level.
//!
//! Levels below the full level are dissolved out of their children.
//! Levels above it copy their parent's geometry under the deeper column
//! names, since no finer subdivision exists.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::geometry::{GeometryError, GeometryService, SelectColumn};
use crate::model::columns::{level_columns, name_columns, pcode_column, ORIGIN_COLUMN};
use crate::model::{AdminLevel, Attributes, LayerKey, MAX_EXTENDED_LEVEL};

/// One operation of a [`HierarchyPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyStep {
    /// Copy the source layer, stamping `adm_origin`.
    Copy { level: AdminLevel },
    /// Union level `from` into its parents at level `to = from - 1`.
    DissolveDown { from: AdminLevel, to: AdminLevel },
    /// Duplicate level `from` as level `to = from + 1`.
    InheritUp { from: AdminLevel, to: AdminLevel },
}

impl HierarchyStep {
    pub fn output_level(&self) -> AdminLevel {
        match *self {
            HierarchyStep::Copy { level } => level,
            HierarchyStep::DissolveDown { to, .. } | HierarchyStep::InheritUp { to, .. } => to,
        }
    }
}

/// Ordered operations that build every extended level from a full level.
///
/// Each level is written before it is read: the copy first, then the
/// downward dissolves, then the upward copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyPlan {
    full: AdminLevel,
    steps: Vec<HierarchyStep>,
}

impl HierarchyPlan {
    pub fn new(full: AdminLevel) -> Self {
        let mut steps = vec![HierarchyStep::Copy { level: full }];
        steps.extend((0..full).rev().map(|to| HierarchyStep::DissolveDown { from: to + 1, to }));
        steps.extend(
            (full + 1..=MAX_EXTENDED_LEVEL).map(|to| HierarchyStep::InheritUp { from: to - 1, to }),
        );
        Self { full, steps }
    }

    pub fn full_level(&self) -> AdminLevel {
        self.full
    }

    pub fn steps(&self) -> &[HierarchyStep] {
        &self.steps
    }

    /// Levels the plan writes, ascending.
    pub fn levels(&self) -> Vec<AdminLevel> {
        let mut levels: Vec<AdminLevel> = self.steps.iter().map(HierarchyStep::output_level).collect();
        levels.sort_unstable();
        levels
    }

    /// Run every step over `service`, writing into
    /// `{output_dir}/cod_ab_{iso3}_{version}/`.
    pub fn execute<S: GeometryService + ?Sized>(
        &self,
        service: &S,
        source: &Path,
        key: &LayerKey,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, GeometryError> {
        let level_path = |level: AdminLevel| key.layer_path(output_dir, level);
        let mut written = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let output = level_path(step.output_level());
            debug!(key = %key, ?step, output = %output.display(), "hierarchy step");
            match *step {
                HierarchyStep::Copy { level } => {
                    service.select(source, &output, &copy_columns(level))?;
                }
                HierarchyStep::DissolveDown { from, to } => {
                    service.dissolve(&level_path(from), &output, &level_columns(to))?;
                }
                HierarchyStep::InheritUp { from, to } => {
                    service.select(&level_path(from), &output, &inherit_columns(to))?;
                }
            }
            written.push(output);
        }
        Ok(written)
    }
}

/// Projection of the source layer: its level columns plus `adm_origin`.
pub fn copy_columns(level: AdminLevel) -> Vec<SelectColumn> {
    level_columns(level)
        .into_iter()
        .filter(|c| c != ORIGIN_COLUMN)
        .map(SelectColumn::Column)
        .chain(std::iter::once(SelectColumn::Constant {
            value: level.to_string(),
            alias: ORIGIN_COLUMN.to_string(),
        }))
        .collect()
}

/// Projection that re-labels level `to - 1` as level `to`.
pub fn inherit_columns(to: AdminLevel) -> Vec<SelectColumn> {
    let parent = to.saturating_sub(1);
    name_columns(parent)
        .into_iter()
        .zip(name_columns(to))
        .map(|(from, to)| SelectColumn::Alias { from, to })
        .chain(level_columns(parent).into_iter().map(SelectColumn::Column))
        .collect()
}

/// P-codes at `level` whose level-`level - 1` parent is not a prefix.
///
/// Level 1 is checked against nothing: its parent is the country itself.
/// Rows with a null p-code on either side are skipped.
pub fn check_prefix_invariant(rows: &[Attributes], level: AdminLevel) -> Vec<String> {
    if level < 2 {
        return Vec::new();
    }
    let child_column = pcode_column(level);
    let parent_column = pcode_column(level - 1);
    rows.iter()
        .filter_map(|row| {
            let child = row.get(&child_column)?.as_deref()?;
            let parent = row.get(&parent_column)?.as_deref()?;
            (!child.starts_with(parent)).then(|| child.to_string())
        })
        .collect()
}
