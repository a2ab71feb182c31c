//! Layer identities and file naming.
//!
//! Service directories are `cod_ab_{iso3}_{version}`; level files inside
//! are `{iso3}_admin{level}.parquet`, and flat staged files carry the
//! version as well: `{iso3}_{version}_admin{level}.parquet`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::AdminLevel;

fn service_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^cod_ab_([a-z]{3})_(v_?\d+)$").expect("valid regex"))
}

fn layer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z]{3})(?:_(v_?\d+))?_admin(\d)\.parquet$").expect("valid regex")
    })
}

/// Identity of one country+version of a boundary dataset.
///
/// The ISO3 code is always upper-case; the version is kept as published
/// (e.g. `v01`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    pub iso3: String,
    pub version: String,
}

impl LayerKey {
    pub fn new(iso3: impl AsRef<str>, version: impl Into<String>) -> Self {
        Self {
            iso3: iso3.as_ref().to_uppercase(),
            version: version.into(),
        }
    }

    /// Service directory name, e.g. `cod_ab_afg_v01`.
    pub fn service_name(&self) -> String {
        format!("cod_ab_{}_{}", self.iso3.to_lowercase(), self.version)
    }

    /// Parse a service directory name back into a key.
    pub fn parse_service_name(name: &str) -> Option<Self> {
        let captures = service_pattern().captures(name)?;
        Some(Self::new(&captures[1], &captures[2]))
    }

    /// File name of one level inside the service directory.
    pub fn layer_file(&self, level: AdminLevel) -> String {
        format!("{}_admin{}.parquet", self.iso3.to_lowercase(), level)
    }

    /// Flat file name used while a layer sits in a staging directory.
    pub fn staged_file(&self, level: AdminLevel) -> String {
        format!(
            "{}_{}_admin{}.parquet",
            self.iso3.to_lowercase(),
            self.version,
            level
        )
    }

    /// Service directory below a stage directory (`country/{stage}`).
    pub fn service_dir(&self, stage_dir: &Path) -> PathBuf {
        stage_dir.join(self.service_name())
    }

    /// Path of one level below a stage directory.
    pub fn layer_path(&self, stage_dir: &Path, level: AdminLevel) -> PathBuf {
        self.service_dir(stage_dir).join(self.layer_file(level))
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.iso3, self.version)
    }
}

/// A parsed boundary file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFile {
    pub iso3: String,
    /// Present only for staged (flat) file names.
    pub version: Option<String>,
    pub level: AdminLevel,
}

impl LevelFile {
    /// Parse `afg_admin2.parquet` or `afg_v01_admin2.parquet`.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = layer_pattern().captures(name)?;
        let level = captures[3].parse().ok()?;
        Some(Self {
            iso3: captures[1].to_uppercase(),
            version: captures.get(2).map(|m| m.as_str().to_string()),
            level,
        })
    }

    /// Parse the file name component of a path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name().and_then(|n| n.to_str()).and_then(Self::parse)
    }

    /// Key of a staged file; `None` when the name carries no version.
    pub fn key(&self) -> Option<LayerKey> {
        self.version
            .as_ref()
            .map(|version| LayerKey::new(&self.iso3, version.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_round_trip() {
        let key = LayerKey::new("afg", "v01");
        assert_eq!(key.iso3, "AFG");
        assert_eq!(key.service_name(), "cod_ab_afg_v01");
        assert_eq!(LayerKey::parse_service_name("cod_ab_afg_v01"), Some(key));
    }

    #[test]
    fn test_unversioned_service_is_rejected() {
        assert_eq!(LayerKey::parse_service_name("cod_ab_afg"), None);
        assert_eq!(LayerKey::parse_service_name("bnda_cty"), None);
    }

    #[test]
    fn test_display_uses_upper_iso3() {
        assert_eq!(LayerKey::new("zzz", "v01").to_string(), "ZZZ_v01");
    }

    #[test]
    fn test_layer_path() {
        let key = LayerKey::new("ZZZ", "v02");
        let path = key.layer_path(Path::new("data/country/original"), 3);
        assert_eq!(
            path,
            PathBuf::from("data/country/original/cod_ab_zzz_v02/zzz_admin3.parquet")
        );
    }

    #[test]
    fn test_parse_level_files() {
        let plain = LevelFile::parse("afg_admin2.parquet").unwrap();
        assert_eq!(plain.iso3, "AFG");
        assert_eq!(plain.level, 2);
        assert_eq!(plain.key(), None);

        let staged = LevelFile::parse("afg_v03_admin1.parquet").unwrap();
        assert_eq!(staged.key(), Some(LayerKey::new("AFG", "v03")));
        assert_eq!(staged.level, 1);

        assert!(LevelFile::parse("afg_admin2.csv").is_none());
        assert!(LevelFile::parse("admin2.parquet").is_none());
    }

    #[test]
    fn test_staged_file_parses_back() {
        let key = LayerKey::new("SSD", "v01");
        let parsed = LevelFile::parse(&key.staged_file(2)).unwrap();
        assert_eq!(parsed.key(), Some(key));
        assert_eq!(parsed.level, 2);
    }
}
