//! `all` / `latest` / `historic` views of the metadata table.

use std::collections::BTreeSet;

use tracing::warn;

use crate::model::{LayerKey, MetadataRecord};

/// The three derived metadata views.
///
/// `all` holds one record per `(country_iso3, version)`; `latest` the last
/// version of each country; `historic` everything else. `all` is always
/// the disjoint union of the other two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataViews {
    pub all: Vec<MetadataRecord>,
    pub latest: Vec<MetadataRecord>,
    pub historic: Vec<MetadataRecord>,
}

impl MetadataViews {
    pub fn build(mut records: Vec<MetadataRecord>) -> Self {
        records.sort_by(|a, b| a.key().cmp(&b.key()));

        // Keep the last row of duplicated keys so the anti-join stays exact.
        let mut all: Vec<MetadataRecord> = Vec::with_capacity(records.len());
        for record in records {
            match all.last_mut() {
                Some(previous) if previous.key() == record.key() => {
                    warn!(key = %record.key(), "duplicate metadata row, keeping the last");
                    *previous = record;
                }
                _ => all.push(record),
            }
        }

        let mut latest: Vec<MetadataRecord> = Vec::new();
        for record in &all {
            match latest.last_mut() {
                Some(previous) if previous.country_iso3 == record.country_iso3 => {
                    *previous = record.clone();
                }
                _ => latest.push(record.clone()),
            }
        }

        let latest_keys: BTreeSet<LayerKey> = latest.iter().map(MetadataRecord::key).collect();
        let historic = all
            .iter()
            .filter(|r| !latest_keys.contains(&r.key()))
            .cloned()
            .collect();

        Self {
            all,
            latest,
            historic,
        }
    }

    pub fn find(&self, key: &LayerKey) -> Option<&MetadataRecord> {
        self.all
            .binary_search_by(|r| r.key().cmp(key))
            .ok()
            .map(|i| &self.all[i])
    }

    /// Whether `all = latest ⊎ historic` holds.
    pub fn is_partition(&self) -> bool {
        let all: BTreeSet<LayerKey> = self.all.iter().map(MetadataRecord::key).collect();
        let latest: BTreeSet<LayerKey> = self.latest.iter().map(MetadataRecord::key).collect();
        let historic: BTreeSet<LayerKey> = self.historic.iter().map(MetadataRecord::key).collect();

        latest.is_disjoint(&historic)
            && latest.len() + historic.len() == self.all.len()
            && all.len() == self.all.len()
            && latest.union(&historic).cloned().collect::<BTreeSet<_>>() == all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(iso3: &str, version: &str) -> MetadataRecord {
        MetadataRecord::for_key(&LayerKey::new(iso3, version))
    }

    fn keys(records: &[MetadataRecord]) -> Vec<String> {
        records.iter().map(|r| r.key().to_string()).collect()
    }

    #[test]
    fn test_views() {
        let views = MetadataViews::build(vec![
            record("BDI", "v01"),
            record("AFG", "v02"),
            record("AFG", "v01"),
            record("AFG", "v03"),
        ]);
        assert_eq!(keys(&views.all), vec!["AFG_v01", "AFG_v02", "AFG_v03", "BDI_v01"]);
        assert_eq!(keys(&views.latest), vec!["AFG_v03", "BDI_v01"]);
        assert_eq!(keys(&views.historic), vec!["AFG_v01", "AFG_v02"]);
        assert!(views.is_partition());
    }

    #[test]
    fn test_single_version_country_has_no_history() {
        let views = MetadataViews::build(vec![record("ZZZ", "v01")]);
        assert_eq!(views.latest.len(), 1);
        assert!(views.historic.is_empty());
        assert!(views.is_partition());
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let mut second = record("AFG", "v01");
        second.source = Some("second".into());
        let views = MetadataViews::build(vec![record("AFG", "v01"), second]);
        assert_eq!(views.all.len(), 1);
        assert_eq!(views.all[0].source.as_deref(), Some("second"));
        assert!(views.is_partition());
    }

    #[test]
    fn test_find() {
        let views = MetadataViews::build(vec![record("AFG", "v01"), record("BDI", "v02")]);
        assert!(views.find(&LayerKey::new("BDI", "v02")).is_some());
        assert!(views.find(&LayerKey::new("BDI", "v01")).is_none());
    }

    #[test]
    fn test_empty() {
        let views = MetadataViews::build(Vec::new());
        assert!(views.is_partition());
    }
}
