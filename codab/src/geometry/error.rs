//! Geometry service errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the external geometry-processing service.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with status {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },

    #[error("layer not found: {0}")]
    MissingLayer(PathBuf),

    #[error("failed to parse tool output: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
