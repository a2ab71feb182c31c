//! CLI command implementations.
//!
//! Each subcommand has its own module with its handler.
//!
//! # Command Modules
//!
//! - [`check`] - Reconcile metadata with the boundary catalog
//! - [`config`] - Configuration management (get, list, path, init)
//! - [`resolve`] - Show the effective full level of one layer
//! - [`run`] - Main command (run every enabled step)

pub mod check;
pub mod common;
pub mod config;
pub mod resolve;
pub mod run;
