//! Extension Preprocessor.
//!
//! Pads every country's hierarchy so levels 0-4 all exist:
//!
//! 1. [`ExtensionPreprocessor`] resolves the full-coverage level and stages
//!    it (minus excluded features) in `country/extended_pre`
//! 2. the edge-matcher may rewrite the staged files into `country/extended_post`
//! 3. [`extend_staged`] runs a [`HierarchyPlan`] per staged file into
//!    `country/extended`

mod extension;
mod filters;
mod hierarchy;
mod preprocess;

pub use extension::{extend_staged, remove_staged, staged_files};
pub use filters::{exclusion_filter, FILTERED_COUNTRIES};
pub use hierarchy::{check_prefix_invariant, copy_columns, inherit_columns, HierarchyPlan, HierarchyStep};
pub use preprocess::ExtensionPreprocessor;
