//! Directory listing of boundary layers below one stage directory.
//!
//! A stage directory holds one `cod_ab_{iso3}_{version}` directory per
//! country+version, each with `{iso3}_admin{level}.parquet` files.
//! Anything else found there is ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Iso3Filter;
use crate::model::{AdminLevel, LayerKey, LevelFile};

/// Levels present for one country+version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub dir: PathBuf,
    pub levels: BTreeSet<AdminLevel>,
}

impl CatalogEntry {
    /// Deepest level present.
    pub fn max_level(&self) -> Option<AdminLevel> {
        self.levels.iter().next_back().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<LayerKey, CatalogEntry>,
}

impl Catalog {
    /// Scan a stage directory. A missing directory is an empty catalog.
    pub fn scan(stage_dir: &Path) -> io::Result<Self> {
        let mut entries = BTreeMap::new();
        if !stage_dir.is_dir() {
            debug!(dir = %stage_dir.display(), "stage directory missing, empty catalog");
            return Ok(Self { entries });
        }

        for entry in fs::read_dir(stage_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(LayerKey::parse_service_name) else {
                continue;
            };

            let mut levels = BTreeSet::new();
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                if let Some(parsed) = file.file_name().to_str().and_then(LevelFile::parse) {
                    if parsed.iso3 == key.iso3 && parsed.version.is_none() {
                        levels.insert(parsed.level);
                    }
                }
            }
            entries.insert(
                key,
                CatalogEntry {
                    dir: entry.path(),
                    levels,
                },
            );
        }

        Ok(Self { entries })
    }

    /// Keep only keys the filter allows.
    pub fn filtered(mut self, filter: &Iso3Filter) -> Self {
        self.entries.retain(|key, _| filter.allows(key));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &LayerKey> {
        self.entries.keys()
    }

    pub fn get(&self, key: &LayerKey) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&LayerKey, &CatalogEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of one level file of an entry.
    pub fn layer_path(&self, key: &LayerKey, level: AdminLevel) -> Option<PathBuf> {
        self.entries
            .get(key)
            .map(|entry| entry.dir.join(key.layer_file(level)))
    }

    /// The last version of each country, in directory-name order.
    pub fn latest_keys(&self) -> Vec<&LayerKey> {
        let mut latest: BTreeMap<&str, &LayerKey> = BTreeMap::new();
        for key in self.entries.keys() {
            latest.insert(key.iso3.as_str(), key);
        }
        latest.into_values().collect()
    }
}

/// Remove the service directory of `key` below `stage_dir`, if present.
///
/// Returns whether anything was removed.
pub fn remove_layer_dir(stage_dir: &Path, key: &LayerKey) -> io::Result<bool> {
    let dir = key.service_dir(stage_dir);
    if !dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(&dir)?;
    debug!(dir = %dir.display(), "removed stale layers");
    Ok(true)
}
