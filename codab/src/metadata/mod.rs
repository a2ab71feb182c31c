//! Metadata Reconciler.
//!
//! Cross-checks the metadata table against the catalog of fetched layers,
//! synthesises records for layers nobody documented, and derives the
//! `all` / `latest` / `historic` views.
//!
//! ```text
//!  metadata_source.csv ──► normalize ──┐
//!                                      ├──► reconcile ──► MetadataViews ──► store
//!  country/original/ ──► Catalog ──────┘
//! ```

mod normalize;
mod overrides;
mod reconcile;
mod store;
mod views;

pub use normalize::normalize;
pub use overrides::{
    supplementary_records, ADMIN_LEVEL_FULL_OVERRIDES, CONTRIBUTOR_OVERRIDES, SOURCE_OVERRIDES,
};
pub use reconcile::{missing_sets, MetadataReconciler, Reconciliation};
pub use store::{metadata_columns, read_source, write_views, METADATA_STEM};
pub use views::MetadataViews;
