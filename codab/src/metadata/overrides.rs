//! Static corrections for upstream metadata.
//!
//! Some countries publish an outdated source or contributor, declare the
//! wrong full-coverage level, or are missing from the table entirely.

use crate::model::{LayerKey, MetadataRecord};

/// Full-coverage levels known to be misdeclared upstream.
pub const ADMIN_LEVEL_FULL_OVERRIDES: [(&str, &str, u8); 4] = [
    ("KGZ", "v01", 1),
    ("PHL", "v03", 3),
    ("QAT", "v01", 1),
    ("QAT", "v02", 1),
];

/// Source replaced for every version of a country.
pub const SOURCE_OVERRIDES: [(&str, &str); 16] = [
    ("GEO", "National Statistics Office of Georgia [Administraciuli erTeulebi]"),
    ("GTM", "Coordinadora Nacional Para La Reducción De Desastres"),
    (
        "HND",
        "Sistema Nacional de Información Territorial (SINIT), Secretaria Técnica de Planificación y Cooperación Externa (SEPLAN), 2010",
    ),
    ("IDN", "Badan Pusat Statistik (BPS - Statistics Indonesia)"),
    ("IRN", "UNHCR"),
    ("IRQ", "Iraq Central Statistics Office"),
    ("JAM", "Jamaica Social Development Commission (sdc.gov.jm)"),
    ("KGZ", "Ministry of Emergency Situations of the Kyrgyz Republic"),
    (
        "LBY",
        "UNITAR-UNOSAT, Libyan Bureau of Statistics, WFP, and Global Logistics Cluster, International Organisation for Migration (IOM)",
    ),
    ("MEX", "Instituto Nacional de Estadística y Geografía (INEGI)"),
    ("MWI", "National Statistics Office of Malawi"),
    ("PER", "Instituto Geográfico Nacional - IGN"),
    (
        "PHL",
        "National Mapping and Resource Information Authority (NAMRIA), Philippines Statistics Authority (PSA)",
    ),
    ("PRK", "World Food Programme"),
    ("SLV", "www.gadm.org"),
    (
        "ZWE",
        "Zimbabwe National Statistics Agency (ZIMSTAT www.zimstat.co.zw) Central Statistics Office",
    ),
];

const ROMENA: &str = "OCHA Middle East and North Africa (ROMENA)";
const FISS: &str = "OCHA Field Information Services Section (FISS)";
const ROLAC: &str = "OCHA Latin America and the Caribbean (ROLAC)";
const ROAP: &str = "OCHA Regional Office for Asia and the Pacific (ROAP)";

/// Contributor replaced for every version of a country.
pub const CONTRIBUTOR_OVERRIDES: [(&str, &str); 17] = [
    ("BFA", "OCHA Burkina Faso"),
    ("GEO", ROMENA),
    ("GTM", FISS),
    ("HND", ROLAC),
    ("IDN", ROAP),
    ("IRN", ROMENA),
    ("IRQ", ROMENA),
    ("JAM", FISS),
    ("KGZ", ROMENA),
    ("LBY", ROMENA),
    ("MEX", ROLAC),
    ("MWI", FISS),
    ("PER", ROLAC),
    ("PHL", "OCHA Philippines"),
    ("PRK", ROAP),
    ("SLV", FISS),
    ("ZWE", "OCHA Regional Office for Southern and Eastern Africa (ROSEA)"),
];

fn lookup<'a>(table: &[(&str, &'a str)], iso3: &str) -> Option<&'a str> {
    table
        .iter()
        .find(|(code, _)| *code == iso3)
        .map(|(_, value)| *value)
}

pub fn source_override(iso3: &str) -> Option<&'static str> {
    lookup(&SOURCE_OVERRIDES, iso3)
}

pub fn contributor_override(iso3: &str) -> Option<&'static str> {
    lookup(&CONTRIBUTOR_OVERRIDES, iso3)
}

pub fn admin_level_full_override(key: &LayerKey) -> Option<u8> {
    ADMIN_LEVEL_FULL_OVERRIDES
        .iter()
        .find(|(iso3, version, _)| key.iso3 == *iso3 && key.version == *version)
        .map(|(_, _, level)| *level)
}

/// Records published without a metadata row; merged only when the table
/// has no row for the key.
pub fn supplementary_records() -> Vec<MetadataRecord> {
    let text = |s: &str| Some(s.to_string());
    vec![MetadataRecord {
        admin_level_max: Some(2),
        admin_1_name: text("Province"),
        admin_2_name: text("Municipio"),
        admin_1_count: Some(16),
        admin_2_count: Some(168),
        date_source: text("2017-09-07"),
        date_updated: text("2019-06-21"),
        date_valid_on: text("2019-06-21"),
        date_reviewed: text("2019-06-21"),
        update_frequency: text("1"),
        source: text("www.gadm.org"),
        contributor: text(FISS),
        methodology_dataset: text("downloaded from www.gadm.org"),
        caveats: text(
            "Version history: 21 June 2019 P-coding and administrative hierarchical adjustments \
             to reflect new COD-PS.  \n  \n17 September 2017 Initial upload",
        ),
        ..MetadataRecord::for_key(&LayerKey::new("CUB", "v01"))
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        assert_eq!(source_override("IRN"), Some("UNHCR"));
        assert_eq!(source_override("BFA"), None);
        assert_eq!(contributor_override("BFA"), Some("OCHA Burkina Faso"));
        assert_eq!(admin_level_full_override(&LayerKey::new("PHL", "v03")), Some(3));
        assert_eq!(admin_level_full_override(&LayerKey::new("PHL", "v02")), None);
    }

    #[test]
    fn test_supplementary_cuba() {
        let records = supplementary_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key().to_string(), "CUB_v01");
        assert_eq!(records[0].count(2), Some(168));
    }
}
