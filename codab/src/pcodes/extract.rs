//! Candidate p-code rows and the rules that accept them.
//!
//! A row is kept only when its p-code is valid and, from level 2 on,
//! its parent was accepted at the level above.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::PcodeRow;
use crate::model::columns::{name_columns, pcode_column};
use crate::model::{AdminLevel, Attributes};

fn value(row: &Attributes, column: &str) -> Option<String> {
    row.get(column).cloned().flatten()
}

/// Candidate rows of one merged level, before any acceptance rule.
///
/// The name is the first non-null of the level's name variants.
pub fn level_rows(level: AdminLevel, features: &[Attributes]) -> Vec<PcodeRow> {
    let names = name_columns(level);
    let pcode = pcode_column(level);
    let parent = pcode_column(level.saturating_sub(1));
    features
        .iter()
        .map(|row| PcodeRow {
            location: value(row, "iso3").unwrap_or_default(),
            admin_level: level,
            pcode: value(row, &pcode),
            name: names[..4].iter().find_map(|c| value(row, c)),
            parent_pcode: value(row, &parent),
            valid_on: value(row, "valid_on"),
        })
        .collect()
}

/// A p-code is usable when it is present and contains an ASCII digit.
pub fn is_valid_pcode(pcode: Option<&str>) -> bool {
    pcode.is_some_and(|p| p.bytes().any(|b| b.is_ascii_digit()))
}

/// Sort order of the table: location, level, p-code, then name with
/// nulls last.
pub fn compare_rows(a: &PcodeRow, b: &PcodeRow) -> Ordering {
    (&a.location, a.admin_level, &a.pcode)
        .cmp(&(&b.location, b.admin_level, &b.pcode))
        .then_with(|| match (&a.name, &b.name) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}

/// Add one level's candidates to the accepted table.
///
/// Candidates need a valid p-code; from level 2 on, their parent must
/// already be accepted. The result is sorted, exact duplicates collapse,
/// and any p-code still occurring more than once is dropped entirely.
pub fn accept_level(accepted: Vec<PcodeRow>, candidates: Vec<PcodeRow>) -> Vec<PcodeRow> {
    let known: BTreeSet<String> = accepted.iter().filter_map(|r| r.pcode.clone()).collect();

    let mut rows = accepted;
    rows.extend(candidates.into_iter().filter(|row| {
        is_valid_pcode(row.pcode.as_deref())
            && (row.admin_level < 2
                || row
                    .parent_pcode
                    .as_ref()
                    .is_some_and(|parent| known.contains(parent)))
    }));

    rows.sort_by(compare_rows);
    rows.dedup();

    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &rows {
        if let Some(pcode) = row.pcode.as_deref() {
            *occurrences.entry(pcode).or_default() += 1;
        }
    }
    let ambiguous: BTreeSet<String> = occurrences
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(p, _)| p.to_string())
        .collect();

    rows.retain(|row| row.pcode.as_ref().is_some_and(|p| !ambiguous.contains(p)));
    rows
}

/// Replace the level-1 parent (the national p-code) with the location.
pub fn parent_to_location(rows: &mut [PcodeRow]) {
    for row in rows.iter_mut().filter(|r| r.admin_level == 1) {
        row.parent_pcode = Some(row.location.clone());
    }
}
