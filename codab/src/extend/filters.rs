//! Per-country features dropped before extension.
//!
//! Some sources carry placeholder or disputed units at level 1 that must
//! not take part in the hierarchy.

use crate::geometry::Predicate;

const ADM1_PCODE: &str = "adm1_pcode";

/// Countries with an exclusion filter.
pub const FILTERED_COUNTRIES: [&str; 4] = ["LBN", "PAK", "SDN", "SSD"];

/// Predicate selecting the features to keep, or `None` to copy unfiltered.
pub fn exclusion_filter(iso3: &str) -> Option<Predicate> {
    match iso3.to_uppercase().as_str() {
        "LBN" => Some(Predicate::not_equal(ADM1_PCODE, "Conflict")),
        "PAK" => Some(Predicate::not_in(ADM1_PCODE, ["PK1", "PK3"])),
        "SDN" => Some(Predicate::not_equal(ADM1_PCODE, "SD19")),
        "SSD" => Some(Predicate::not_equal(ADM1_PCODE, "SS00")),
        _ => None,
    }
}
