//! Dataset summary handed to the external publisher.
//!
//! Computed from the latest metadata view and the p-code table, written
//! as `summary.json` at the root of the data directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::merge::bundle_file;
use crate::model::{MetadataRecord, ProcessingStage, VersionScope};
use crate::pcodes::{PcodeRow, LENGTHS_STEM, PCODES_ADM_1_2_STEM, PCODES_STEM};
use crate::table::TableError;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundariesSummary {
    /// Countries and territories in the latest view.
    pub layer_count: usize,
    /// Earliest `date_valid_on` to latest `date_reviewed`.
    pub time_period: TimePeriod,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcodesSummary {
    /// Accepted p-codes per level, keyed `adm1` .. `adm5`.
    pub counts: BTreeMap<String, usize>,
    /// Earliest `valid_on` to the generation date.
    pub time_period: TimePeriod,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub generated_at: DateTime<Utc>,
    pub boundaries: BoundariesSummary,
    pub pcodes: Option<PcodesSummary>,
}

/// Leading `YYYY-MM-DD` of a date or timestamp string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn dates<'a>(values: impl Iterator<Item = Option<&'a str>>) -> impl Iterator<Item = NaiveDate> {
    values.flatten().filter_map(parse_date)
}

impl DatasetSummary {
    pub fn build(
        latest: &[MetadataRecord],
        pcodes: Option<&[PcodeRow]>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut resources: Vec<String> = [
            ProcessingStage::Matched,
            ProcessingStage::Original,
            ProcessingStage::Extended,
        ]
        .iter()
        .map(|stage| bundle_file(*stage, VersionScope::Latest))
        .collect();
        resources.push("metadata_latest.csv".to_string());

        let boundaries = BoundariesSummary {
            layer_count: latest.len(),
            time_period: TimePeriod {
                start: dates(latest.iter().map(|r| r.date_valid_on.as_deref())).min(),
                end: dates(latest.iter().map(|r| r.date_reviewed.as_deref())).max(),
            },
            resources,
        };

        let pcodes = pcodes.map(|rows| {
            let mut counts = BTreeMap::new();
            for row in rows {
                *counts.entry(format!("adm{}", row.admin_level)).or_default() += 1;
            }
            PcodesSummary {
                counts,
                time_period: TimePeriod {
                    start: dates(rows.iter().map(|r| r.valid_on.as_deref())).min(),
                    end: Some(generated_at.date_naive()),
                },
                resources: [PCODES_STEM, PCODES_ADM_1_2_STEM, LENGTHS_STEM]
                    .iter()
                    .map(|stem| format!("{}.csv", stem))
                    .collect(),
            }
        });

        Self {
            generated_at,
            boundaries,
            pcodes,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self).map_err(TableError::from)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LayerKey;
    use chrono::TimeZone;

    fn record(iso3: &str, valid_on: Option<&str>, reviewed: Option<&str>) -> MetadataRecord {
        let mut record = MetadataRecord::for_key(&LayerKey::new(iso3, "v01"));
        record.date_valid_on = valid_on.map(str::to_string);
        record.date_reviewed = reviewed.map(str::to_string);
        record
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2021-11-17"), NaiveDate::from_ymd_opt(2021, 11, 17));
        assert_eq!(
            parse_date("2021-11-17T00:00:00Z"),
            NaiveDate::from_ymd_opt(2021, 11, 17)
        );
        assert_eq!(parse_date("unknown"), None);
    }

    #[test]
    fn test_boundaries_period() {
        let latest = vec![
            record("AFG", Some("2021-11-17"), Some("2023-01-01")),
            record("BDI", Some("2019-06-01"), None),
            record("CAF", None, Some("2024-02-02")),
        ];
        let summary = DatasetSummary::build(&latest, None, now());
        assert_eq!(summary.boundaries.layer_count, 3);
        assert_eq!(
            summary.boundaries.time_period.start,
            NaiveDate::from_ymd_opt(2019, 6, 1)
        );
        assert_eq!(
            summary.boundaries.time_period.end,
            NaiveDate::from_ymd_opt(2024, 2, 2)
        );
        assert!(summary.pcodes.is_none());
    }

    #[test]
    fn test_pcode_counts() {
        let row = |level, valid_on: &str| PcodeRow {
            location: "AFG".into(),
            admin_level: level,
            pcode: Some(format!("AF{}", level)),
            name: None,
            parent_pcode: None,
            valid_on: Some(valid_on.into()),
        };
        let rows = vec![row(1, "2021-11-17"), row(1, "2020-01-01"), row(2, "2022-01-01")];
        let summary = DatasetSummary::build(&[], Some(&rows), now());
        let pcodes = summary.pcodes.unwrap();
        assert_eq!(pcodes.counts.get("adm1"), Some(&2));
        assert_eq!(pcodes.counts.get("adm2"), Some(&1));
        assert_eq!(pcodes.time_period.start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(pcodes.time_period.end, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        let summary = DatasetSummary::build(&[record("AFG", None, None)], None, now());
        summary.write(&path).unwrap();
        let parsed: DatasetSummary =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, summary);
    }
}
