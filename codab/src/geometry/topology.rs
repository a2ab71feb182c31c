//! Edge-matching scratch store on top of a per-job GeoPackage.
//!
//! Tables created for a job named `ns`:
//!
//! | table      | content                                   |
//! |------------|-------------------------------------------|
//! | `ns_00`    | input polygons with their feature id      |
//! | `ns_attr`  | input attributes keyed by feature id      |
//! | `ns_01`    | polygon boundary lines                    |
//! | `ns_ref`   | reference international boundary lines    |
//! | `ns_02`    | lines snapped to the reference            |
//! | `ns_05`    | polygons rebuilt from the snapped lines   |
//! | `ns_ext`   | reference extent of the country           |

use std::fs;
use std::path::{Path, PathBuf};

use super::gdal::{layer_name, parse_csv_attributes};
use super::{ClipSpec, GdalService, GeometryError, ScratchSpace, ToolCommand, TopologyStore};

fn database(scratch: &ScratchSpace) -> PathBuf {
    scratch.dir.join(format!("{}.gpkg", scratch.namespace))
}

impl GdalService {
    /// Run a SQLite-dialect statement that writes a new scratch table.
    fn scratch_sql(&self, scratch: &ScratchSpace, table: &str, sql: &str) -> Result<(), GeometryError> {
        let db = database(scratch);
        let command = ToolCommand::vector("sql")
            .path(&db)
            .path(&db)
            .arg("--update")
            .arg(format!("--output-layer={}", table))
            .arg("--overwrite-layer")
            .sqlite_dialect()
            .sql(sql)
            .arg("--quiet");
        self.runner.run(&command).map(|_| ())
    }

    /// Copy an external layer into the scratch database.
    fn scratch_import(
        &self,
        scratch: &ScratchSpace,
        input: &Path,
        table: &str,
        sql: &str,
    ) -> Result<(), GeometryError> {
        let command = ToolCommand::vector("sql")
            .path(input)
            .path(&database(scratch))
            .arg("--update")
            .arg(format!("--output-layer={}", table))
            .arg("--overwrite-layer")
            .sqlite_dialect()
            .sql(sql)
            .arg("--quiet");
        self.runner.run(&command).map(|_| ())
    }

    /// Run a query returning one numeric `area` value.
    ///
    /// Validation queries never tolerate tool failure, and a missing value
    /// is an error rather than zero.
    fn scratch_area(&self, scratch: &ScratchSpace, sql: &str) -> Result<f64, GeometryError> {
        let command = ToolCommand::vector("sql")
            .path(&database(scratch))
            .arg("/vsistdout/")
            .arg("--output-format=CSV")
            .sqlite_dialect()
            .sql(sql)
            .arg("--quiet");
        let output = self.runner.strict().run(&command)?;
        parse_area(&command, &output.stdout)
    }
}

fn parse_area(command: &ToolCommand, stdout: &str) -> Result<f64, GeometryError> {
    let unexpected = |reason: String| GeometryError::UnexpectedOutput {
        command: command.to_string(),
        reason,
    };
    if stdout.trim().is_empty() {
        return Err(unexpected("no output".to_string()));
    }
    let rows = parse_csv_attributes(stdout)?;
    let value = rows
        .first()
        .and_then(|row| row.get("area").cloned().flatten())
        .ok_or_else(|| unexpected("no area value".to_string()))?;
    let area = value
        .trim()
        .parse::<f64>()
        .map_err(|e| unexpected(format!("area '{}' is not numeric: {}", value, e)))?;
    if !area.is_finite() {
        return Err(unexpected(format!("area '{}' is not finite", value)));
    }
    Ok(area)
}

impl TopologyStore for GdalService {
    fn load(&self, scratch: &ScratchSpace, input: &Path) -> Result<(), GeometryError> {
        fs::create_dir_all(&scratch.dir)?;
        let source = layer_name(input);
        self.scratch_import(
            scratch,
            input,
            &scratch.table("00"),
            &format!("SELECT rowid AS fid, geometry FROM {}", source),
        )?;
        self.scratch_import(
            scratch,
            input,
            &scratch.table("attr"),
            &format!("SELECT rowid AS fid, * FROM {}", source),
        )
    }

    fn derive_lines(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        self.scratch_sql(
            scratch,
            &scratch.table("01"),
            &format!(
                "SELECT fid, ST_Boundary(geometry) AS geometry FROM {}",
                scratch.table("00")
            ),
        )
    }

    fn snap(&self, scratch: &ScratchSpace, reference_lines: &Path, distance: f64) -> Result<(), GeometryError> {
        self.scratch_import(
            scratch,
            reference_lines,
            &scratch.table("ref"),
            &format!("SELECT geometry FROM {}", layer_name(reference_lines)),
        )?;
        self.scratch_sql(
            scratch,
            &scratch.table("02"),
            &format!(
                "SELECT a.fid, ST_Snap(a.geometry, (SELECT ST_Union(geometry) FROM {}), {}) AS geometry \
                 FROM {} AS a",
                scratch.table("ref"),
                distance,
                scratch.table("01")
            ),
        )
    }

    fn merge_attributes(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        self.scratch_sql(
            scratch,
            &scratch.table("05"),
            &format!(
                "SELECT fid, ST_MakeValid(ST_BuildArea(geometry)) AS geometry FROM {}",
                scratch.table("02")
            ),
        )
    }

    fn overlap_area(&self, scratch: &ScratchSpace) -> Result<f64, GeometryError> {
        let table = scratch.table("05");
        self.scratch_area(
            scratch,
            &format!(
                "SELECT COALESCE(SUM(ST_Area(ST_Intersection(a.geometry, b.geometry))), 0) AS area \
                 FROM {table} AS a JOIN {table} AS b \
                 ON a.fid < b.fid AND ST_Intersects(a.geometry, b.geometry)",
                table = table
            ),
        )
    }

    fn gap_area(&self, scratch: &ScratchSpace, extent: &ClipSpec) -> Result<f64, GeometryError> {
        self.scratch_import(
            scratch,
            &extent.reference,
            &scratch.table("ext"),
            &format!(
                "SELECT geometry FROM {} WHERE {}",
                layer_name(&extent.reference),
                extent.like_where()
            ),
        )?;
        self.scratch_area(
            scratch,
            &format!(
                "SELECT COALESCE(ST_Area(ST_Difference(\
                 (SELECT ST_Union(geometry) FROM {}), \
                 (SELECT ST_Union(geometry) FROM {}))), 0) AS area",
                scratch.table("ext"),
                scratch.table("05")
            ),
        )
    }

    fn export(&self, scratch: &ScratchSpace, output: &Path, layer: &str) -> Result<(), GeometryError> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let sql = format!(
            "SELECT b.*, a.geometry FROM {} AS a LEFT JOIN {} AS b ON a.fid = b.fid",
            scratch.table("05"),
            scratch.table("attr")
        );
        let command = ToolCommand::vector("sql")
            .path(&database(scratch))
            .path(output)
            .sqlite_dialect()
            .sql(&sql)
            .arg(format!("--output-layer={}", layer))
            .arg("--lco=GEOMETRY_NAME=geometry")
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn discard(&self, scratch: &ScratchSpace) -> Result<(), GeometryError> {
        let db = database(scratch);
        if db.exists() {
            fs::remove_file(&db)?;
        }
        Ok(())
    }
}
