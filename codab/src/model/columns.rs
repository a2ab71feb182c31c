//! Attribute column sets.
//!
//! Every boundary layer at level `L` carries the name/pcode columns of its
//! own level and of every ancestor, followed by the country-wide columns.

use super::AdminLevel;

/// Country-wide columns carried by every level.
pub const COUNTRY_COLUMNS: [&str; 10] = [
    "lang", "lang1", "lang2", "lang3", "iso2", "iso3", "version", "valid_on", "valid_to",
    "adm_origin",
];

/// Column recording which source level a synthesised layer came from.
pub const ORIGIN_COLUMN: &str = "adm_origin";

/// Name variants and the pcode of one level, in column order.
pub fn name_columns(level: AdminLevel) -> [String; 5] {
    [
        format!("adm{}_name", level),
        format!("adm{}_name1", level),
        format!("adm{}_name2", level),
        format!("adm{}_name3", level),
        format!("adm{}_pcode", level),
    ]
}

/// Pcode column of one level.
pub fn pcode_column(level: AdminLevel) -> String {
    format!("adm{}_pcode", level)
}

/// Full attribute column set of a level, finest level first.
pub fn level_columns(level: AdminLevel) -> Vec<String> {
    let mut columns = Vec::with_capacity(5 * (level as usize + 1) + COUNTRY_COLUMNS.len());
    for l in (0..=level).rev() {
        columns.extend(name_columns(l));
    }
    columns.extend(COUNTRY_COLUMNS.iter().map(|c| c.to_string()));
    columns
}
