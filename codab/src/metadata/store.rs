//! Reading the metadata table and persisting the derived views.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use super::MetadataViews;
use crate::error::PipelineError;
use crate::model::MetadataRecord;
use crate::table::{Column, CsvOptions, Table, TableError};

/// File stem of the persisted views; suffixed with `_all`, `_latest`, `_historic`.
pub const METADATA_STEM: &str = "metadata";

const INT_COLUMNS: [&str; 7] = [
    "admin_level_full",
    "admin_level_max",
    "admin_1_count",
    "admin_2_count",
    "admin_3_count",
    "admin_4_count",
    "admin_5_count",
];

const COLUMN_NAMES: [&str; 30] = [
    "country_name",
    "country_iso2",
    "country_iso3",
    "version",
    "admin_level_full",
    "admin_level_max",
    "admin_1_name",
    "admin_2_name",
    "admin_3_name",
    "admin_4_name",
    "admin_5_name",
    "admin_1_count",
    "admin_2_count",
    "admin_3_count",
    "admin_4_count",
    "admin_5_count",
    "admin_notes",
    "date_source",
    "date_updated",
    "date_reviewed",
    "date_metadata",
    "date_valid_on",
    "date_valid_to",
    "update_frequency",
    "update_type",
    "source",
    "contributor",
    "methodology_dataset",
    "methodology_pcodes",
    "caveats",
];

/// Published column layout of the metadata views.
pub fn metadata_columns() -> Vec<Column> {
    COLUMN_NAMES
        .iter()
        .map(|name| {
            if INT_COLUMNS.contains(name) {
                Column::int(name)
            } else {
                Column::text(name)
            }
        })
        .collect()
}

/// Read the metadata table delivered by the fetcher.
///
/// Any failure here is fatal to the run.
pub fn read_source(path: &Path) -> Result<Vec<MetadataRecord>, PipelineError> {
    let unavailable = |reason: String| PipelineError::MetadataUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| unavailable(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut csv_reader = csv::Reader::from_reader(text.as_bytes());
    csv_reader
        .deserialize()
        .collect::<Result<Vec<MetadataRecord>, _>>()
        .map_err(|e| unavailable(e.to_string()))
}

/// Persist every view as CSV (UTF-8 with BOM) and Parquet.
pub fn write_views(dir: &Path, views: &MetadataViews) -> Result<Vec<PathBuf>, TableError> {
    let options = CsvOptions {
        bom: true,
        hxl: false,
    };
    let mut written = Vec::new();
    for (suffix, records) in [
        ("all", &views.all),
        ("latest", &views.latest),
        ("historic", &views.historic),
    ] {
        let table = Table::from_records(metadata_columns(), records)?;
        let stem = dir.join(format!("{}_{}", METADATA_STEM, suffix));
        written.extend(table.write_both(&stem, options)?);
        info!(view = suffix, records = records.len(), "wrote metadata view");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LayerKey;
    use std::fs;

    #[test]
    fn test_columns_cover_record_fields() {
        let record = MetadataRecord::default();
        let value = serde_json::to_value(&record).unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(fields.len(), COLUMN_NAMES.len());
        for name in COLUMN_NAMES {
            assert!(fields.contains_key(name), "missing field {}", name);
        }
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let err = read_source(Path::new("/nonexistent/metadata_source.csv")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_read_source_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata_source.csv");
        fs::write(
            &path,
            "\u{feff}country_iso3,version,admin_level_full,admin_level_max\nAFG,v01,2,2\n",
        )
        .unwrap();
        let records = read_source(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country_iso3, "AFG");
        assert_eq!(records[0].admin_level_full, Some(2));
    }

    #[test]
    fn test_write_views() {
        let dir = tempfile::tempdir().unwrap();
        let views = MetadataViews::build(vec![
            MetadataRecord::for_key(&LayerKey::new("AFG", "v01")),
            MetadataRecord::for_key(&LayerKey::new("AFG", "v02")),
        ]);
        let written = write_views(dir.path(), &views).unwrap();
        assert_eq!(written.len(), 6);

        let historic = read_source(&dir.path().join("metadata_historic.csv")).unwrap();
        assert_eq!(historic.len(), 1);
        assert_eq!(historic[0].version, "v01");
    }
}
