//! Metadata table rows.

use serde::{Deserialize, Deserializer, Serialize};

use super::{AdminLevel, LayerKey, MAX_LEVEL};

/// Placeholder some sources use instead of leaving a level name empty.
pub const UNKNOWN_NAME_PLACEHOLDER: &str = "currently not known";

/// One row of the metadata table: one country+version.
///
/// Field names match the published CSV header. Invariant after
/// normalisation: `admin_level_full <= admin_level_max`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    pub country_name: Option<String>,
    pub country_iso2: Option<String>,
    pub country_iso3: String,
    pub version: String,
    #[serde(deserialize_with = "lenient_level")]
    pub admin_level_full: Option<AdminLevel>,
    #[serde(deserialize_with = "lenient_level")]
    pub admin_level_max: Option<AdminLevel>,
    pub admin_1_name: Option<String>,
    pub admin_2_name: Option<String>,
    pub admin_3_name: Option<String>,
    pub admin_4_name: Option<String>,
    pub admin_5_name: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub admin_1_count: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub admin_2_count: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub admin_3_count: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub admin_4_count: Option<u64>,
    #[serde(deserialize_with = "lenient_count")]
    pub admin_5_count: Option<u64>,
    pub admin_notes: Option<String>,
    pub date_source: Option<String>,
    pub date_updated: Option<String>,
    pub date_reviewed: Option<String>,
    pub date_metadata: Option<String>,
    #[serde(alias = "date_valid_from")]
    pub date_valid_on: Option<String>,
    pub date_valid_to: Option<String>,
    pub update_frequency: Option<String>,
    pub update_type: Option<String>,
    pub source: Option<String>,
    pub contributor: Option<String>,
    pub methodology_dataset: Option<String>,
    pub methodology_pcodes: Option<String>,
    #[serde(alias = "caveates")]
    pub caveats: Option<String>,
}

impl MetadataRecord {
    /// Create an otherwise empty record for a key.
    pub fn for_key(key: &LayerKey) -> Self {
        Self {
            country_iso3: key.iso3.clone(),
            version: key.version.clone(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> LayerKey {
        LayerKey::new(&self.country_iso3, self.version.clone())
    }

    /// Feature count recorded for a level (1-5).
    pub fn count(&self, level: AdminLevel) -> Option<u64> {
        match level {
            1 => self.admin_1_count,
            2 => self.admin_2_count,
            3 => self.admin_3_count,
            4 => self.admin_4_count,
            5 => self.admin_5_count,
            _ => None,
        }
    }

    pub fn set_count(&mut self, level: AdminLevel, count: Option<u64>) {
        match level {
            1 => self.admin_1_count = count,
            2 => self.admin_2_count = count,
            3 => self.admin_3_count = count,
            4 => self.admin_4_count = count,
            5 => self.admin_5_count = count,
            _ => {}
        }
    }

    /// Mutable access to every level name, level 1 first.
    pub fn level_names_mut(&mut self) -> [&mut Option<String>; 5] {
        [
            &mut self.admin_1_name,
            &mut self.admin_2_name,
            &mut self.admin_3_name,
            &mut self.admin_4_name,
            &mut self.admin_5_name,
        ]
    }
}

fn parse_level_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Accept `2`, `2.0`, empty or non-numeric markers such as `Unknown`.
fn lenient_level<'de, D>(deserializer: D) -> Result<Option<AdminLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(parse_level_text)
        .filter(|v| *v <= MAX_LEVEL as f64)
        .map(|v| v as AdminLevel))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_level_text).map(|v| v as u64))
}
