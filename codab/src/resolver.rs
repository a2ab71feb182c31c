//! Admin-Level Resolver.
//!
//! The metadata declares which level has complete coverage, but the file
//! for that level is not always present. The resolver searches outward
//! from the declared level, preferring deeper levels over shallower ones.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::metadata::MetadataViews;
use crate::model::{AdminLevel, LayerKey, MAX_LEVEL};

/// How far from the declared level the search goes, in either direction.
pub const SEARCH_WINDOW: i8 = 4;

/// Outcome of a level search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub declared: AdminLevel,
    pub level: AdminLevel,
    /// `level - declared`.
    pub offset: i8,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.offset < 0 { '-' } else { '+' };
        write!(
            f,
            "ADM{}{}{} (ADM{})",
            self.declared,
            sign,
            self.offset.unsigned_abs(),
            self.level
        )
    }
}

/// Levels in the order they are tried: declared, deeper, then shallower.
pub fn search_order(declared: AdminLevel) -> Vec<(AdminLevel, i8)> {
    let mut order = vec![(declared, 0)];
    for offset in (1..=SEARCH_WINDOW).chain((1..=SEARCH_WINDOW).map(|o| -o)) {
        let level = declared as i16 + offset as i16;
        if (0..=MAX_LEVEL as i16).contains(&level) {
            order.push((level as AdminLevel, offset));
        }
    }
    order
}

/// Pick the first available level in search order.
pub fn resolve_level(declared: AdminLevel, available: &BTreeSet<AdminLevel>) -> Option<Resolution> {
    search_order(declared)
        .into_iter()
        .find(|(level, _)| available.contains(level))
        .map(|(level, offset)| Resolution {
            declared,
            level,
            offset,
        })
}

/// A resolved full-coverage layer of one country+version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayer {
    pub key: LayerKey,
    pub resolution: Resolution,
    pub path: PathBuf,
}

/// Resolves the effective full level of catalog entries.
pub struct AdminLevelResolver<'a> {
    views: &'a MetadataViews,
    catalog: &'a Catalog,
}

impl<'a> AdminLevelResolver<'a> {
    pub fn new(views: &'a MetadataViews, catalog: &'a Catalog) -> Self {
        Self { views, catalog }
    }

    /// Declared full level, falling back to the deepest file present.
    pub fn declared_level(&self, key: &LayerKey) -> Option<AdminLevel> {
        let declared = self
            .views
            .find(key)
            .and_then(|record| record.admin_level_full);
        if declared.is_some() {
            return declared;
        }
        let fallback = self.catalog.get(key).and_then(|entry| entry.max_level());
        if let Some(level) = fallback {
            warn!(key = %key, level, "no declared full level, using deepest file");
        }
        fallback
    }

    pub fn resolve(&self, key: &LayerKey) -> Result<ResolvedLayer, PipelineError> {
        let declared = self.declared_level(key);
        let missing = || PipelineError::MissingLevel {
            key: key.clone(),
            declared: declared.unwrap_or(0),
        };

        let entry = self.catalog.get(key).ok_or_else(missing)?;
        let resolution = declared
            .and_then(|d| resolve_level(d, &entry.levels))
            .ok_or_else(missing)?;

        if resolution.offset != 0 {
            info!(
                key = %key,
                offset = resolution.offset,
                "Using offset {} for {}",
                resolution,
                key
            );
        }
        Ok(ResolvedLayer {
            key: key.clone(),
            resolution,
            path: entry.dir.join(key.layer_file(resolution.level)),
        })
    }
}
