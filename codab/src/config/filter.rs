//! ISO3 include/exclude filtering.

use std::collections::BTreeSet;

use crate::model::LayerKey;

const ISO3_LEN: usize = 3;

/// Country (and country+version) include/exclude lists.
///
/// Entries are comma separated and case-insensitive. Three-letter entries
/// name countries; an exclude entry such as `AFG_V01` drops only that
/// version. Any other entry is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Iso3Filter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
    exclude_versions: BTreeSet<(String, String)>,
}

impl Iso3Filter {
    pub fn new(include: &str, exclude: &str) -> Self {
        let mut filter = Self::default();
        filter.set_include(include);
        filter.set_exclude(exclude);
        filter
    }

    pub fn set_include(&mut self, list: &str) {
        self.include = entries(list).filter(|e| e.len() == ISO3_LEN).collect();
    }

    pub fn set_exclude(&mut self, list: &str) {
        self.exclude.clear();
        self.exclude_versions.clear();
        for entry in entries(list) {
            if entry.len() == ISO3_LEN {
                self.exclude.insert(entry);
            } else if let Some((iso3, version)) = entry.split_once('_') {
                if iso3.len() == ISO3_LEN && !version.is_empty() {
                    self.exclude_versions
                        .insert((iso3.to_string(), version.to_lowercase()));
                }
            }
        }
    }

    /// Whether any country passes the include/exclude lists.
    pub fn allows_country(&self, iso3: &str) -> bool {
        let iso3 = iso3.to_uppercase();
        (self.include.is_empty() || self.include.contains(&iso3)) && !self.exclude.contains(&iso3)
    }

    /// Whether a specific country+version passes.
    pub fn allows(&self, key: &LayerKey) -> bool {
        self.allows_country(&key.iso3)
            && !self
                .exclude_versions
                .contains(&(key.iso3.to_uppercase(), key.version.to_lowercase()))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.exclude_versions.is_empty()
    }

    /// Include list, comma joined.
    pub fn include_list(&self) -> String {
        self.include.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Exclude list including version entries, comma joined.
    pub fn exclude_list(&self) -> String {
        self.exclude
            .iter()
            .cloned()
            .chain(
                self.exclude_versions
                    .iter()
                    .map(|(iso3, version)| format!("{}_{}", iso3, version.to_uppercase())),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn entries(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|e| e.trim().to_uppercase())
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_allows_everything() {
        let filter = Iso3Filter::default();
        assert!(filter.is_empty());
        assert!(filter.allows(&LayerKey::new("AFG", "v01")));
    }

    #[test]
    fn test_include_list() {
        let filter = Iso3Filter::new("afg, BDI", "");
        assert!(filter.allows_country("AFG"));
        assert!(filter.allows_country("bdi"));
        assert!(!filter.allows_country("NPL"));
    }

    #[test]
    fn test_invalid_entries_are_ignored() {
        let filter = Iso3Filter::new("AF,AFGH,", "");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_version_exclude() {
        let filter = Iso3Filter::new("", "AFG_V01,NPL");
        assert!(!filter.allows(&LayerKey::new("AFG", "v01")));
        assert!(filter.allows(&LayerKey::new("AFG", "v02")));
        assert!(!filter.allows(&LayerKey::new("NPL", "v03")));
        assert_eq!(filter.exclude_list(), "NPL,AFG_V01");
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = Iso3Filter::new("AFG", "AFG");
        assert!(!filter.allows_country("AFG"));
    }
}
