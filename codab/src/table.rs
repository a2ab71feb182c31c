//! Tabular artifacts written as CSV and Parquet side by side.
//!
//! Metadata views and p-code tables are small attribute-only tables.
//! They are published in both formats: CSV (optionally with a UTF-8 BOM
//! and an HXL hashtag row under the header) and ZSTD-compressed Parquet.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_schema::{ArrowError, DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const ZSTD_LEVEL: i32 = 15;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("row has {actual} cells, table has {expected} columns")]
    Shape { expected: usize, actual: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Utf8,
    Int64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    /// HXL hashtag written on the second CSV row.
    pub hxl: Option<String>,
}

impl Column {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ColumnType::Utf8,
            hxl: None,
        }
    }

    pub fn int(name: &str) -> Self {
        Self {
            kind: ColumnType::Int64,
            ..Self::text(name)
        }
    }

    pub fn with_hxl(mut self, tag: &str) -> Self {
        self.hxl = Some(tag.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cell {
    Null,
    Int(i64),
    Text(String),
}

impl Cell {
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Cell::Null, |v| Cell::Text(v.to_string()))
    }

    fn as_csv(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(v) => v.to_string(),
            Cell::Text(v) => v.clone(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Text(v) => v.parse().ok(),
            Cell::Null => None,
        }
    }

    fn as_str(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            other => Some(other.as_csv()),
        }
    }
}

/// CSV rendering switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvOptions {
    pub bom: bool,
    pub hxl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from serializable records, one column per listed field.
    ///
    /// Fields not listed are ignored; listed fields a record lacks are null.
    pub fn from_records<T: Serialize>(columns: Vec<Column>, records: &[T]) -> Result<Self, TableError> {
        let mut table = Self::new(columns);
        for record in records {
            let value = serde_json::to_value(record)?;
            let row = table
                .columns
                .iter()
                .map(|column| match &value[column.name.as_str()] {
                    serde_json::Value::Null => Cell::Null,
                    serde_json::Value::String(s) => Cell::Text(s.clone()),
                    serde_json::Value::Number(n) => n
                        .as_i64()
                        .map(Cell::Int)
                        .unwrap_or_else(|| Cell::Text(n.to_string())),
                    other => Cell::Text(other.to_string()),
                })
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::Shape {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv(&self, path: &Path, options: CsvOptions) -> Result<(), TableError> {
        ensure_parent(path)?;
        let mut file = File::create(path)?;
        if options.bom {
            file.write_all(UTF8_BOM)?;
        }
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        if options.hxl && self.columns.iter().any(|c| c.hxl.is_some()) {
            writer.write_record(self.columns.iter().map(|c| c.hxl.as_deref().unwrap_or("")))?;
        }
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::as_csv))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_parquet(&self, path: &Path) -> Result<(), TableError> {
        ensure_parent(path)?;
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| {
                let data_type = match c.kind {
                    ColumnType::Utf8 => DataType::Utf8,
                    ColumnType::Int64 => DataType::Int64,
                };
                Field::new(&c.name, data_type, true)
            })
            .collect();
        let schema = Arc::new(Schema::new(fields));

        let arrays: Vec<ArrayRef> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| -> ArrayRef {
                match column.kind {
                    ColumnType::Utf8 => Arc::new(StringArray::from(
                        self.rows.iter().map(|r| r[i].as_str()).collect::<Vec<_>>(),
                    )),
                    ColumnType::Int64 => Arc::new(Int64Array::from(
                        self.rows.iter().map(|r| r[i].as_i64()).collect::<Vec<_>>(),
                    )),
                }
            })
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let properties = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::try_new(ZSTD_LEVEL)?))
            .build();
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(properties))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Write `{stem}.csv` and `{stem}.parquet`; returns both paths.
    pub fn write_both(&self, stem: &Path, options: CsvOptions) -> Result<[PathBuf; 2], TableError> {
        let csv_path = stem.with_extension("csv");
        let parquet_path = stem.with_extension("parquet");
        self.write_csv(&csv_path, options)?;
        self.write_parquet(&parquet_path)?;
        Ok([csv_path, parquet_path])
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
