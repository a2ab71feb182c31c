//! Cross-check of metadata rows against the layers actually fetched.
//!
//! Layers nobody documented get a record synthesised from their files;
//! documented keys without layers are only reported.

use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::PipelineError;
use crate::geometry::GeometryService;
use crate::model::{LayerKey, MetadataRecord};

/// Keys present on one side only, both sorted.
///
/// Returns `(boundary − metadata, metadata − boundary)`.
pub fn missing_sets(
    metadata_keys: &BTreeSet<LayerKey>,
    boundary_keys: &BTreeSet<LayerKey>,
) -> (Vec<LayerKey>, Vec<LayerKey>) {
    let missing_metadata = boundary_keys.difference(metadata_keys).cloned().collect();
    let missing_boundaries = metadata_keys.difference(boundary_keys).cloned().collect();
    (missing_metadata, missing_boundaries)
}

/// Outcome of reconciling the metadata table with the catalog.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Table rows plus synthesised rows, sorted by `(country_iso3, version)`.
    pub records: Vec<MetadataRecord>,
    /// Layers found on disk without a metadata row.
    pub missing_metadata: Vec<LayerKey>,
    /// Metadata rows without layers on disk.
    pub missing_boundaries: Vec<LayerKey>,
}

impl Reconciliation {
    /// The non-fatal consistency error, when either side has gaps.
    pub fn consistency_error(&self) -> Option<PipelineError> {
        if self.missing_metadata.is_empty() && self.missing_boundaries.is_empty() {
            return None;
        }
        Some(PipelineError::Consistency {
            missing_metadata: self.missing_metadata.clone(),
            missing_boundaries: self.missing_boundaries.clone(),
        })
    }
}

/// Reconciles metadata rows with fetched boundary layers.
pub struct MetadataReconciler<'a, S: ?Sized> {
    service: &'a S,
}

impl<'a, S: GeometryService + ?Sized> MetadataReconciler<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    pub fn reconcile(&self, records: Vec<MetadataRecord>, catalog: &Catalog) -> Reconciliation {
        let metadata_keys: BTreeSet<LayerKey> = records.iter().map(MetadataRecord::key).collect();
        let boundary_keys: BTreeSet<LayerKey> = catalog.keys().cloned().collect();
        let (missing_metadata, missing_boundaries) = missing_sets(&metadata_keys, &boundary_keys);

        let mut reconciliation = Reconciliation {
            records,
            missing_metadata,
            missing_boundaries,
        };
        if let Some(e) = reconciliation.consistency_error() {
            error!(
                missing_metadata = ?reconciliation.missing_metadata.iter().map(LayerKey::to_string).collect::<Vec<_>>(),
                missing_boundaries = ?reconciliation.missing_boundaries.iter().map(LayerKey::to_string).collect::<Vec<_>>(),
                "{}",
                e
            );
        }

        for key in &reconciliation.missing_metadata {
            if let Some(entry) = catalog.get(key) {
                let record = self.synthesize(key, entry);
                info!(
                    key = %key,
                    admin_level_max = ?record.admin_level_max,
                    "synthesised metadata record"
                );
                reconciliation.records.push(record);
            }
        }
        reconciliation.records.sort_by(|a, b| {
            (a.country_iso3.as_str(), a.version.as_str())
                .cmp(&(b.country_iso3.as_str(), b.version.as_str()))
        });
        reconciliation
    }

    /// Build a record from the layer files alone.
    ///
    /// The deepest file present defines both `admin_level_max` and
    /// `admin_level_full`; per-level counts come from the files.
    pub fn synthesize(&self, key: &LayerKey, entry: &CatalogEntry) -> MetadataRecord {
        let mut record = MetadataRecord::for_key(key);
        let Some(max) = entry.max_level() else {
            return record;
        };
        record.admin_level_max = Some(max);
        record.admin_level_full = Some(max);

        let deepest = entry.dir.join(key.layer_file(max));
        match self.service.read_attributes(&deepest) {
            Ok(rows) => {
                if let Some(first) = rows.first() {
                    record.country_iso2 = first.get("iso2").cloned().flatten();
                    record.country_name = first.get("adm0_name").cloned().flatten();
                    record.date_valid_on = first.get("valid_on").cloned().flatten();
                }
            }
            Err(e) => warn!(key = %key, level = max, error = %e, "cannot read layer attributes"),
        }

        for level in 1..=max {
            if !entry.levels.contains(&level) {
                continue;
            }
            let path = entry.dir.join(key.layer_file(level));
            match self.service.feature_count(&path) {
                Ok(count) => record.set_count(level, Some(count as u64)),
                Err(e) => warn!(key = %key, level, error = %e, "cannot count features"),
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[(&str, &str)]) -> BTreeSet<LayerKey> {
        list.iter().map(|(i, v)| LayerKey::new(i, *v)).collect()
    }

    #[test]
    fn test_missing_sets() {
        let metadata = keys(&[("AFG", "v01"), ("BDI", "v01"), ("CAF", "v02")]);
        let boundaries = keys(&[("AFG", "v01"), ("CAF", "v01"), ("ZZZ", "v01")]);
        let (missing_metadata, missing_boundaries) = missing_sets(&metadata, &boundaries);

        let names = |v: &[LayerKey]| v.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        assert_eq!(names(&missing_metadata), vec!["CAF_v01", "ZZZ_v01"]);
        assert_eq!(names(&missing_boundaries), vec!["BDI_v01", "CAF_v02"]);
    }

    #[test]
    fn test_consistent_catalog_has_no_error() {
        let reconciliation = Reconciliation::default();
        assert!(reconciliation.consistency_error().is_none());
    }
}
