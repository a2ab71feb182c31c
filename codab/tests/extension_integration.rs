//! Integration tests for level resolution and hierarchy extension.
//!
//! These tests verify:
//! - the resolver searches deeper levels before shallower ones
//! - a staged layer extends to every level 0-4
//! - dissolving down unions children with a shared parent
//! - inherited levels carry the parent's codes under their own level

mod support;

use codab::catalog::Catalog;
use codab::extend::{check_prefix_invariant, extend_staged, ExtensionPreprocessor};
use codab::model::columns::ORIGIN_COLUMN;
use codab::model::LayerKey;
use codab::pipeline::Pipeline;
use codab::resolver::Resolution;
use support::{admin_feature, by_attribute, read_layer, rect, write_layer, DataDir, MetadataRow};

// =============================================================================
// Test Helpers
// =============================================================================

/// Ten ADM2 units over four ADM1 parents of country "ZZ".
fn ten_districts() -> Vec<support::Feature> {
    let parents = [("ZZ01", 3), ("ZZ02", 3), ("ZZ03", 2), ("ZZ04", 2)];
    let mut features = Vec::new();
    let mut x = 0;
    for (parent, children) in parents {
        for child in 1..=children {
            let code = format!("{}{:02}", parent, child);
            features.push(admin_feature("ZZZ", "v01", &["ZZ", parent, code.as_str()], rect(x, 0, x + 1, 1)));
            x += 1;
        }
    }
    features
}

// =============================================================================
// Resolver
// =============================================================================

#[test]
fn test_resolver_prefers_deeper_level() {
    let data = DataDir::new();
    let key = LayerKey::new("ZZZ", "v01");
    data.write_original(&key, 0, &[admin_feature("ZZZ", "v01", &["ZZ"], rect(0, 0, 1, 1))]);
    data.write_original(&key, 1, &[admin_feature("ZZZ", "v01", &["ZZ", "ZZ01"], rect(0, 0, 1, 1))]);
    data.write_original(
        &key,
        3,
        &[admin_feature("ZZZ", "v01", &["ZZ", "ZZ01", "ZZ0101", "ZZ010101"], rect(0, 0, 1, 1))],
    );
    data.write_metadata(&[MetadataRow::new("ZZZ", "v01", 2, 3)]);

    let pipeline = Pipeline::new(data.config(), data.service());
    let reconciled = pipeline.reconcile().unwrap();
    let resolved = reconciled.resolver().resolve(&key).unwrap();

    assert_eq!(
        resolved.resolution,
        Resolution {
            declared: 2,
            level: 3,
            offset: 1
        }
    );
    assert_eq!(resolved.resolution.to_string(), "ADM2+1 (ADM3)");
    assert!(resolved.path.ends_with("cod_ab_zzz_v01/zzz_admin3.parquet"));
}

#[test]
fn test_resolver_reports_missing_level() {
    let data = DataDir::new();
    let key = LayerKey::new("ZZZ", "v01");
    std::fs::create_dir_all(data.config().country_dir("original").join(key.service_name())).unwrap();
    data.write_metadata(&[MetadataRow::new("ZZZ", "v01", 2, 2)]);

    let pipeline = Pipeline::new(data.config(), data.service());
    let reconciled = pipeline.reconcile().unwrap();
    let err = reconciled.resolver().resolve(&key).unwrap_err();
    assert!(err.to_string().contains("ZZZ_v01"));
    assert!(!err.is_fatal());
}

// =============================================================================
// Extension
// =============================================================================

#[test]
fn test_dissolve_down_ten_to_four() {
    let data = DataDir::new();
    let service = data.service();
    let staged = data.path("country/extended_pre/zzz_v01_admin2.parquet");
    write_layer(&staged, &ten_districts()).unwrap();
    let output = data.path("country/extended");

    let outcome = extend_staged(&service, &data.path("country/extended_pre"), &output);
    assert!(outcome.is_clean(), "{:?}", outcome.failures);
    assert_eq!(outcome.written.len(), 5);
    assert!(!staged.exists());

    let key = LayerKey::new("ZZZ", "v01");
    let admin1 = read_layer(&key.layer_path(&output, 1)).unwrap();
    assert_eq!(admin1.len(), 4);
    let provinces = by_attribute(&admin1, "adm1_pcode");
    assert_eq!(provinces["ZZ01"].cells, rect(0, 0, 3, 1));
    assert_eq!(provinces["ZZ04"].cells, rect(8, 0, 10, 1));
    assert!(!provinces["ZZ01"].attributes.contains_key("adm2_pcode"));

    let admin0 = read_layer(&key.layer_path(&output, 0)).unwrap();
    assert_eq!(admin0.len(), 1);
    assert_eq!(admin0[0].cells, rect(0, 0, 10, 1));
    assert_eq!(admin0[0].attributes[ORIGIN_COLUMN].as_deref(), Some("2"));
}

#[test]
fn test_inherit_up_relabels_parent() {
    let data = DataDir::new();
    let service = data.service();
    write_layer(
        &data.path("country/extended_pre/zzz_v01_admin2.parquet"),
        &ten_districts(),
    )
    .unwrap();
    let output = data.path("country/extended");
    extend_staged(&service, &data.path("country/extended_pre"), &output);

    let key = LayerKey::new("ZZZ", "v01");
    let admin4 = read_layer(&key.layer_path(&output, 4)).unwrap();
    assert_eq!(admin4.len(), 10);
    for feature in &admin4 {
        let pcode = |level: u8| feature.attributes[&format!("adm{}_pcode", level)].clone();
        assert_eq!(pcode(4), pcode(2));
        assert_eq!(pcode(3), pcode(2));
        assert_eq!(feature.attributes["adm4_name"], feature.attributes["adm2_name"]);
    }

    for level in 2..=4 {
        let rows: Vec<_> = read_layer(&key.layer_path(&output, level))
            .unwrap()
            .into_iter()
            .map(|f| f.attributes)
            .collect();
        assert!(check_prefix_invariant(&rows, level).is_empty(), "ADM{}", level);
    }
}

#[test]
fn test_preprocessor_applies_exclusion_filter() {
    let data = DataDir::new();
    let key = LayerKey::new("SSD", "v01");
    let features = vec![
        admin_feature("SSD", "v01", &["SS", "SS01"], rect(0, 0, 1, 1)),
        admin_feature("SSD", "v01", &["SS", "SS00"], rect(1, 0, 2, 1)),
        admin_feature("SSD", "v01", &["SS", "SS02"], rect(2, 0, 3, 1)),
    ];
    data.write_original(&key, 0, &[admin_feature("SSD", "v01", &["SS"], rect(0, 0, 3, 1))]);
    data.write_original(&key, 1, &features);
    data.write_metadata(&[MetadataRow::new("SSD", "v01", 1, 1)]);

    let pipeline = Pipeline::new(data.config(), data.service());
    let reconciled = pipeline.reconcile().unwrap();
    let staging = data.path("country/extended_pre");
    let preprocessor = ExtensionPreprocessor::new(pipeline.service(), &staging);
    let outcome = preprocessor.run(&reconciled.catalog, &reconciled.resolver());
    assert!(outcome.is_clean());

    let staged = read_layer(&staging.join("ssd_v01_admin1.parquet")).unwrap();
    let codes: Vec<String> = by_attribute(&staged, "adm1_pcode").into_keys().collect();
    assert_eq!(codes, vec!["SS01", "SS02"]);

    let original = Catalog::scan(&data.config().country_dir("original")).unwrap();
    assert_eq!(original.len(), 1);
}
