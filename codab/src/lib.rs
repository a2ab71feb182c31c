//! COD-AB Global - boundary reconciliation for administrative boundaries
//!
//! This library turns the per-country, per-version COD-AB layers published by
//! national authorities into three consistent global views (original,
//! extended and matched) plus the global p-code hierarchy.
//!
//! # High-Level API
//!
//! The [`pipeline`] module drives every stage in order:
//!
//! ```ignore
//! use codab::config::PipelineConfig;
//! use codab::geometry::GdalService;
//! use codab::pipeline::Pipeline;
//!
//! let config = PipelineConfig::load()?;
//! let service = GdalService::new(&config);
//! let report = Pipeline::new(config, service).run()?;
//! println!("{}", report);
//! ```
//!
//! Raw geometric work (union, clip, snapping, format conversion) is never
//! done in-process. It is delegated to an external geometry service behind
//! the [`geometry::GeometryService`] and [`geometry::TopologyStore`] traits.

pub mod catalog;
pub mod clip;
pub mod config;
pub mod edge_match;
pub mod error;
pub mod extend;
pub mod fetch;
pub mod geometry;
pub mod logging;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod pcodes;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod summary;
pub mod table;

/// Version of the codab library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
