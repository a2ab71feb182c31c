//! P-code length profiles per country.

use std::collections::{BTreeMap, BTreeSet};

use super::PcodeRow;
use crate::model::Attributes;

/// P-code length profile of one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcodeLengths {
    pub location: String,
    /// Length of the national p-code.
    pub country_length: Option<usize>,
    /// Per level 1-5: distinct suffix lengths, ascending, joined by `|`.
    pub levels: [Option<String>; 5],
}

/// National p-code lengths from the merged level-0 layer, keyed by `iso3`.
pub fn country_lengths(admin0: &[Attributes]) -> BTreeMap<String, usize> {
    admin0
        .iter()
        .filter_map(|row| {
            let iso3 = row.get("iso3").cloned().flatten()?;
            let pcode = row.get("adm0_pcode").cloned().flatten()?;
            Some((iso3, pcode.chars().count()))
        })
        .collect()
}

/// Suffix lengths per country and level.
///
/// Rows count when they are at level 1, or when their p-code extends
/// their parent's. Must run before the level-1 parent is replaced.
pub fn compute_lengths(rows: &[PcodeRow], countries: &BTreeMap<String, usize>) -> Vec<PcodeLengths> {
    let mut suffixes: BTreeMap<&str, [BTreeSet<usize>; 5]> = BTreeMap::new();
    for row in rows {
        let (Some(pcode), Some(parent)) = (row.pcode.as_deref(), row.parent_pcode.as_deref()) else {
            continue;
        };
        if row.admin_level == 0 || row.admin_level > 5 {
            continue;
        }
        if row.admin_level != 1 && !pcode.starts_with(parent) {
            continue;
        }
        let length = pcode.chars().count().saturating_sub(parent.chars().count());
        suffixes.entry(row.location.as_str()).or_default()[row.admin_level as usize - 1].insert(length);
    }

    suffixes
        .into_iter()
        .map(|(location, levels)| PcodeLengths {
            location: location.to_string(),
            country_length: countries.get(location).copied(),
            levels: levels.map(|set| {
                (!set.is_empty()).then(|| {
                    set.iter()
                        .map(usize::to_string)
                        .collect::<Vec<_>>()
                        .join("|")
                })
            }),
        })
        .collect()
}
