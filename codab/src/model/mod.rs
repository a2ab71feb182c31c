//! Core data model shared by every pipeline stage.
//!
//! - [`LayerKey`] identifies one country+version and knows how its files are named
//! - [`ProcessingStage`] and [`VersionScope`] address the stage directory tree
//! - [`columns`] defines the attribute column sets per admin level
//! - [`MetadataRecord`] is one row of the metadata table

pub mod columns;
mod layer;
mod metadata;
mod stage;

pub use layer::{LayerKey, LevelFile};
pub use metadata::{MetadataRecord, UNKNOWN_NAME_PLACEHOLDER};
pub use stage::{ProcessingStage, VersionScope};

use std::collections::BTreeMap;

/// Administrative level, 0 (country) through 5 (finest).
pub type AdminLevel = u8;

/// Deepest admin level any source layer may carry.
pub const MAX_LEVEL: AdminLevel = 5;

/// Deepest admin level synthesised by the extended and matched stages.
pub const MAX_EXTENDED_LEVEL: AdminLevel = 4;

/// One feature's non-geometry attributes, keyed by column name.
pub type Attributes = BTreeMap<String, Option<String>>;
