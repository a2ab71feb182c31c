//! Pipeline error taxonomy.
//!
//! Every per-file failure carries enough context (country, version, level)
//! to be reported at the end of a run. Only [`PipelineError::is_fatal`]
//! errors abort a run; all others skip the affected unit.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigFileError;
use crate::geometry::GeometryError;
use crate::model::{AdminLevel, LayerKey};
use crate::table::TableError;

/// Errors raised while reconciling boundaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Metadata table and boundary catalog disagree.
    #[error(
        "metadata/boundary mismatch: {} without metadata, {} without boundaries",
        missing_metadata.len(),
        missing_boundaries.len()
    )]
    Consistency {
        missing_metadata: Vec<LayerKey>,
        missing_boundaries: Vec<LayerKey>,
    },

    /// No admin-level file within the search window.
    #[error("no admin level found for {key} within +/-4 of ADM{declared}")]
    MissingLevel { key: LayerKey, declared: AdminLevel },

    /// Residual gaps or overlaps after edge-matching.
    #[error("topology check failed for {file}: {check} area {area:e} exceeds {epsilon:e}")]
    Topology {
        file: String,
        check: TopologyCheck,
        area: f64,
        epsilon: f64,
    },

    /// The geometry service failed, or a network call exhausted its retries.
    #[error("{context}: {source}")]
    ExternalTool {
        context: String,
        #[source]
        source: ExternalFailure,
    },

    /// A network call failed in a way that may succeed on retry.
    #[error("transient network failure during {operation}: {reason}")]
    TransientNetwork { operation: String, reason: String },

    /// A worker panicked while processing one job.
    #[error("worker panicked on {job}: {message}")]
    WorkerPanic { job: String, message: String },

    /// The metadata table could not be read at all.
    #[error("metadata table unavailable at {path}: {reason}")]
    MetadataUnavailable { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigFileError),

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Cause of an [`PipelineError::ExternalTool`] failure.
#[derive(Debug, Error)]
pub enum ExternalFailure {
    #[error(transparent)]
    Tool(#[from] GeometryError),

    #[error("gave up after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
}

/// Which topology validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyCheck {
    Overlaps,
    Gaps,
}

impl std::fmt::Display for TopologyCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyCheck::Overlaps => f.write_str("overlap"),
            TopologyCheck::Gaps => f.write_str("gap"),
        }
    }
}

impl PipelineError {
    /// Wrap a geometry-service failure with the unit it happened in.
    pub fn external(context: impl Into<String>, source: impl Into<ExternalFailure>) -> Self {
        PipelineError::ExternalTool {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Whether this error must halt the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::MetadataUnavailable { .. } | PipelineError::Config(_)
        )
    }
}
