//! End-of-run report.

use std::fmt;

use super::StageOutcome;
use crate::config::RunStep;
use crate::error::PipelineError;
use crate::model::LayerKey;

/// One skipped unit as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    pub step: RunStep,
    pub unit: String,
    pub reason: String,
}

/// Everything a run did and everything it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub steps: Vec<RunStep>,
    pub missing_metadata: Vec<LayerKey>,
    pub missing_boundaries: Vec<LayerKey>,
    pub topology_failures: Vec<SkippedUnit>,
    pub tool_failures: Vec<SkippedUnit>,
    pub skipped: Vec<SkippedUnit>,
    pub files_written: usize,
}

impl RunReport {
    /// Fold a stage outcome into the report, classifying its failures.
    pub fn record(&mut self, step: RunStep, outcome: StageOutcome) {
        self.steps.push(step);
        self.files_written += outcome.written.len();
        for failure in outcome.failures {
            self.record_failure(step, failure.unit, &failure.error);
        }
    }

    pub fn record_failure(&mut self, step: RunStep, unit: impl Into<String>, error: &PipelineError) {
        let entry = SkippedUnit {
            step,
            unit: unit.into(),
            reason: error.to_string(),
        };
        match error {
            PipelineError::Topology { .. } => self.topology_failures.push(entry),
            PipelineError::ExternalTool { .. } | PipelineError::WorkerPanic { .. } => {
                self.tool_failures.push(entry)
            }
            _ => self.skipped.push(entry),
        }
    }

    /// A run is clean when no layer failed topology validation.
    pub fn is_clean(&self) -> bool {
        self.topology_failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.topology_failures.len() + self.tool_failures.len() + self.skipped.len()
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, units: &[SkippedUnit]) -> fmt::Result {
    if units.is_empty() {
        return Ok(());
    }
    writeln!(f, "{} ({}):", title, units.len())?;
    for unit in units {
        writeln!(f, "  [{}] {}: {}", unit.step, unit.unit, unit.reason)?;
    }
    Ok(())
}

fn write_keys(f: &mut fmt::Formatter<'_>, title: &str, keys: &[LayerKey]) -> fmt::Result {
    if keys.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = keys.iter().map(LayerKey::to_string).collect();
    writeln!(f, "{} ({}): {}", title, keys.len(), names.join(", "))
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(RunStep::name).collect();
        writeln!(f, "Run report")?;
        writeln!(f, "==========")?;
        writeln!(f, "Steps: {}", if steps.is_empty() { "-".to_string() } else { steps.join(", ") })?;
        writeln!(f, "Files written: {}", self.files_written)?;
        write_keys(f, "Missing metadata", &self.missing_metadata)?;
        write_keys(f, "Missing boundaries", &self.missing_boundaries)?;
        write_section(f, "Topology failures", &self.topology_failures)?;
        write_section(f, "Tool failures", &self.tool_failures)?;
        write_section(f, "Skipped", &self.skipped)?;
        if self.is_clean() {
            write!(f, "Status: clean")
        } else {
            write!(f, "Status: {} topology failure(s)", self.topology_failures.len())
        }
    }
}
