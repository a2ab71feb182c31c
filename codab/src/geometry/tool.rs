//! Invocation of the external `gdal` tool.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use super::GeometryError;

/// Layer creation options for every Parquet output.
pub const PARQUET_OPTIONS: [&str; 4] = [
    "--overwrite",
    "--quiet",
    "--lco=COMPRESSION=ZSTD",
    "--lco=COMPRESSION_LEVEL=15",
];

/// Arguments of one `gdal` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCommand {
    args: Vec<String>,
}

impl ToolCommand {
    /// Start a `gdal vector <subcommand>` invocation.
    pub fn vector(subcommand: &str) -> Self {
        Self {
            args: vec!["vector".to_string(), subcommand.to_string()],
        }
    }

    /// Start a `gdal vsi <subcommand>` invocation.
    pub fn vsi(subcommand: &str) -> Self {
        Self {
            args: vec!["vsi".to_string(), subcommand.to_string()],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn paths(mut self, paths: &[PathBuf]) -> Self {
        self.args
            .extend(paths.iter().map(|p| p.display().to_string()));
        self
    }

    /// Pipeline step separator.
    pub fn pipe(self) -> Self {
        self.arg("!")
    }

    pub fn sql(self, sql: &str) -> Self {
        self.arg(format!("--sql={}", sql))
    }

    pub fn sqlite_dialect(self) -> Self {
        self.arg("--dialect=SQLITE")
    }

    pub fn parquet_output(mut self) -> Self {
        self.args.extend(PARQUET_OPTIONS.iter().map(|s| s.to_string()));
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gdal {}", self.args.join(" "))
    }
}

/// Captured standard output of a finished invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
}

/// Runs geometry commands synchronously.
///
/// Commands are treated as deterministic and never retried. With
/// `tolerate_failure` a non-zero exit is logged and the run continues.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: PathBuf,
    tolerate_failure: bool,
}

impl ToolRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            tolerate_failure: false,
        }
    }

    pub fn with_tolerate_failure(mut self, tolerate: bool) -> Self {
        self.tolerate_failure = tolerate;
        self
    }

    /// Same program, failing on every non-zero exit.
    pub fn strict(&self) -> Self {
        self.clone().with_tolerate_failure(false)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn run(&self, command: &ToolCommand) -> Result<ToolOutput, GeometryError> {
        debug!(command = %command, "running geometry tool");

        let output = Command::new(&self.program)
            .args(command.args())
            .output()
            .map_err(|source| GeometryError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(ToolOutput { stdout });
        }

        let status = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if self.tolerate_failure {
            warn!(
                command = %command,
                status,
                stderr = %stderr,
                "geometry tool failed, continuing"
            );
            return Ok(ToolOutput { stdout });
        }

        Err(GeometryError::NonZeroExit {
            command: command.to_string(),
            status,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_rendering() {
        let cmd = ToolCommand::vector("filter")
            .path(Path::new("in.parquet"))
            .path(Path::new("out.parquet"))
            .arg("--where=adm1_pcode <> 'SS00'")
            .parquet_output();
        assert_eq!(
            cmd.to_string(),
            "gdal vector filter in.parquet out.parquet --where=adm1_pcode <> 'SS00' \
             --overwrite --quiet --lco=COMPRESSION=ZSTD --lco=COMPRESSION_LEVEL=15"
        );
    }

    #[test]
    fn test_pipeline_separators() {
        let cmd = ToolCommand::vector("pipeline")
            .arg("read")
            .path(Path::new("a.parquet"))
            .pipe()
            .arg("make-valid");
        assert_eq!(cmd.args(), ["vector", "pipeline", "read", "a.parquet", "!", "make-valid"]);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = ToolRunner::new("/nonexistent/gdal-binary");
        let err = runner.run(&ToolCommand::vector("info")).unwrap_err();
        assert!(matches!(err, GeometryError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit() {
        let runner = ToolRunner::new("false");
        let err = runner.run(&ToolCommand::default()).unwrap_err();
        match err {
            GeometryError::NonZeroExit { status, .. } => assert_eq!(status, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_tolerated_non_zero_exit() {
        let runner = ToolRunner::new("false").with_tolerate_failure(true);
        assert!(runner.run(&ToolCommand::default()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_strict_runner_ignores_tolerance() {
        let runner = ToolRunner::new("false").with_tolerate_failure(true).strict();
        assert!(matches!(
            runner.run(&ToolCommand::default()),
            Err(GeometryError::NonZeroExit { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_is_captured() {
        let runner = ToolRunner::new("echo");
        let output = runner.run(&ToolCommand::default().arg("area")).unwrap();
        assert_eq!(output.stdout.trim(), "area");
    }
}
