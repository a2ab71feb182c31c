//! Cleaning of the raw metadata table before reconciliation.

use std::collections::BTreeSet;

use isocountry::CountryCode;
use tracing::debug;

use super::overrides::{
    admin_level_full_override, contributor_override, source_override, supplementary_records,
};
use crate::config::Iso3Filter;
use crate::model::{LayerKey, MetadataRecord, UNKNOWN_NAME_PLACEHOLDER};

/// Clean a freshly fetched metadata table.
///
/// - supplementary records are added for keys the table lacks
/// - source and contributor overrides are applied per country
/// - country name and ISO2 are derived from the ISO3 code
/// - unknown full level falls back to the deepest level
/// - static level overrides are applied
/// - rows without a version or without any subnational level are dropped
/// - ISO3 include/exclude filters are applied
/// - placeholder level names become null
/// - `admin_level_full` is clamped to `admin_level_max`
///
/// The result is sorted by `(country_iso3, version)`.
pub fn normalize(records: Vec<MetadataRecord>, filter: &Iso3Filter) -> Vec<MetadataRecord> {
    let mut records: Vec<MetadataRecord> = records
        .into_iter()
        .map(|mut record| {
            record.country_iso3 = record.country_iso3.trim().to_uppercase();
            record.version = record.version.trim().to_string();
            record
        })
        .collect();
    let present: BTreeSet<LayerKey> = records.iter().map(MetadataRecord::key).collect();
    records.extend(
        supplementary_records()
            .into_iter()
            .filter(|record| !present.contains(&record.key())),
    );

    let mut out: Vec<MetadataRecord> = records
        .into_iter()
        .filter_map(|mut record| {
            if record.version.is_empty() || !record.admin_level_max.is_some_and(|max| max > 0) {
                debug!(key = %record.key(), "dropping metadata row without version or levels");
                return None;
            }
            let key = record.key();
            if !filter.allows(&key) {
                return None;
            }

            if let Some(source) = source_override(&key.iso3) {
                record.source = Some(source.to_string());
            }
            if let Some(contributor) = contributor_override(&key.iso3) {
                record.contributor = Some(contributor.to_string());
            }
            apply_country_identity(&mut record);

            if record.admin_level_full.is_none() {
                record.admin_level_full = record.admin_level_max;
            }
            if let Some(level) = admin_level_full_override(&key) {
                record.admin_level_full = Some(level);
            }
            if let (Some(full), Some(max)) = (record.admin_level_full, record.admin_level_max) {
                if full > max {
                    debug!(key = %key, full, max, "clamping admin_level_full");
                    record.admin_level_full = Some(max);
                }
            }

            for name in record.level_names_mut() {
                if name
                    .as_deref()
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(UNKNOWN_NAME_PLACEHOLDER))
                {
                    *name = None;
                }
            }
            Some(record)
        })
        .collect();

    out.sort_by(|a, b| {
        (a.country_iso3.as_str(), a.version.as_str()).cmp(&(b.country_iso3.as_str(), b.version.as_str()))
    });
    out
}

/// Set country name and ISO2 from the ISO3 code. Codes outside ISO 3166
/// keep whatever the table published.
fn apply_country_identity(record: &mut MetadataRecord) {
    match CountryCode::for_alpha3(&record.country_iso3) {
        Ok(country) => {
            record.country_name = Some(country.name().to_string());
            record.country_iso2 = Some(country.alpha2().to_string());
        }
        Err(_) => debug!(iso3 = %record.country_iso3, "not an ISO 3166 code, keeping country name"),
    }
}
