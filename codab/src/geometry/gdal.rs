//! `gdal` CLI implementation of the geometry service.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{
    ClipSpec, GeometryError, GeometryService, Predicate, SelectColumn, ToolCommand, ToolRunner,
};
use crate::config::PipelineConfig;
use crate::model::Attributes;

/// Geometry service backed by the `gdal` command-line tool.
#[derive(Debug, Clone)]
pub struct GdalService {
    pub(super) runner: ToolRunner,
}

impl GdalService {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_runner(
            ToolRunner::new(&config.gdal_bin).with_tolerate_failure(config.tolerate_tool_failure),
        )
    }

    pub fn with_runner(runner: ToolRunner) -> Self {
        Self { runner }
    }

    fn ensure_parent(output: &Path) -> Result<(), GeometryError> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// SQL table name of a single-layer file (its file stem).
pub(super) fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn group_by_clause(group_by: &[String]) -> String {
    if group_by.is_empty() {
        String::new()
    } else {
        format!(" GROUP BY {}", group_by.join(","))
    }
}

fn select_prefix(columns: &[String]) -> String {
    if columns.is_empty() {
        String::new()
    } else {
        format!("{}, ", columns.join(","))
    }
}

/// Parse CSV emitted on stdout into attribute rows.
///
/// Empty fields become nulls.
pub(super) fn parse_csv_attributes(text: &str) -> Result<Vec<Attributes>, GeometryError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| {
                let value = (!value.is_empty()).then(|| value.to_string());
                (column.to_string(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Extract the first layer's `featureCount` from `gdal vector info` JSON.
pub(super) fn parse_feature_count(command: &ToolCommand, json: &str) -> Result<usize, GeometryError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| GeometryError::UnexpectedOutput {
            command: command.to_string(),
            reason: e.to_string(),
        })?;
    value["layers"][0]["featureCount"]
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| GeometryError::UnexpectedOutput {
            command: command.to_string(),
            reason: "no featureCount in layer info".to_string(),
        })
}

impl GeometryService for GdalService {
    fn read_attributes(&self, layer: &Path) -> Result<Vec<Attributes>, GeometryError> {
        if !layer.exists() {
            return Err(GeometryError::MissingLayer(layer.to_path_buf()));
        }
        let command = ToolCommand::vector("convert")
            .path(layer)
            .arg("/vsistdout/")
            .arg("--output-format=CSV")
            .arg("--quiet");
        let output = self.runner.run(&command)?;
        parse_csv_attributes(&output.stdout)
    }

    fn feature_count(&self, layer: &Path) -> Result<usize, GeometryError> {
        if !layer.exists() {
            return Err(GeometryError::MissingLayer(layer.to_path_buf()));
        }
        let command = ToolCommand::vector("info")
            .path(layer)
            .arg("--format=json");
        let output = self.runner.run(&command)?;
        parse_feature_count(&command, &output.stdout)
    }

    fn filter(&self, input: &Path, output: &Path, predicate: &Predicate) -> Result<(), GeometryError> {
        Self::ensure_parent(output)?;
        let command = ToolCommand::vector("filter")
            .path(input)
            .path(output)
            .arg(format!("--where={}", predicate.to_sql()))
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn select(&self, input: &Path, output: &Path, columns: &[SelectColumn]) -> Result<(), GeometryError> {
        Self::ensure_parent(output)?;
        let projection: Vec<String> = columns.iter().map(SelectColumn::to_sql).collect();
        let sql = format!(
            "SELECT {}geometry FROM {}",
            select_prefix(&projection),
            layer_name(input)
        );
        let command = ToolCommand::vector("sql")
            .path(input)
            .path(output)
            .sql(&sql)
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn dissolve(&self, input: &Path, output: &Path, group_by: &[String]) -> Result<(), GeometryError> {
        Self::ensure_parent(output)?;
        let sql = format!(
            "SELECT {}ST_Union(geometry) AS geometry FROM {}{}",
            select_prefix(group_by),
            layer_name(input),
            group_by_clause(group_by)
        );
        let command = ToolCommand::vector("sql")
            .path(input)
            .path(output)
            .sqlite_dialect()
            .sql(&sql)
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn clip_dissolve(
        &self,
        input: &Path,
        output: &Path,
        clip: &ClipSpec,
        group_by: &[String],
    ) -> Result<(), GeometryError> {
        Self::ensure_parent(output)?;
        let sql = format!(
            "SELECT {}ST_Union(geometry) AS geometry FROM {} \
             WHERE ST_GeometryType(geometry) IN ('POLYGON', 'MULTIPOLYGON'){}",
            select_prefix(group_by),
            layer_name(input),
            group_by_clause(group_by)
        );
        let command = ToolCommand::vector("pipeline")
            .arg("read")
            .path(input)
            .pipe()
            .arg("clip")
            .arg(format!("--like={}", clip.reference.display()))
            .arg(format!("--like-where={}", clip.like_where()))
            .pipe()
            .arg("sql")
            .sqlite_dialect()
            .sql(&sql)
            .pipe()
            .arg("make-valid")
            .pipe()
            .arg("write")
            .path(output)
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn concat(&self, inputs: &[PathBuf], output: &Path, clean_coverage: bool) -> Result<(), GeometryError> {
        Self::ensure_parent(output)?;
        let mut command = ToolCommand::vector("pipeline")
            .arg("concat")
            .arg("--mode=single")
            .paths(inputs)
            .pipe();
        if clean_coverage {
            command = command.arg("clean-coverage").pipe();
        }
        let command = command
            .arg("make-valid")
            .pipe()
            .arg("write")
            .path(output)
            .parquet_output();
        self.runner.run(&command).map(|_| ())
    }

    fn bundle(&self, inputs: &[PathBuf], archive: &Path) -> Result<(), GeometryError> {
        Self::ensure_parent(archive)?;
        let gdb_name = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.gdb".to_string());
        let staging = archive.with_file_name(&gdb_name);

        let concat = ToolCommand::vector("concat")
            .paths(inputs)
            .path(&staging)
            .arg("--overwrite")
            .arg("--quiet")
            .arg("--skip-errors")
            .arg("--lco=TARGET_ARCGIS_VERSION=ARCGIS_PRO_3_2_OR_LATER");
        self.runner.run(&concat)?;

        let zip = ToolCommand::vsi("copy")
            .arg("--recursive")
            .path(&staging)
            .arg(format!("/vsizip/{}/{}", archive.display(), gdb_name));
        let result = self.runner.run(&zip).map(|_| ());
        if staging.exists() {
            debug!(path = %staging.display(), "removing bundle staging directory");
            fs::remove_dir_all(&staging)?;
        }
        result
    }
}
