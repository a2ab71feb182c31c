//! Check command - reconcile metadata with the boundary catalog only.

use std::path::PathBuf;

use codab::model::LayerKey;

use super::common::ConfigOverrides;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the check command.
///
/// Prints the layers missing on either side. A mismatch is reported but is
/// not an error.
pub fn run(config: Option<PathBuf>, overrides: ConfigOverrides, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), &overrides, debug)?;
    runner.log_startup("check");

    let reconciled = runner.create_pipeline().reconcile()?;

    println!("Metadata Reconciliation");
    println!("=======================");
    println!();
    println!("Layers on disk:     {}", reconciled.catalog.len());
    println!("Metadata rows:      {}", reconciled.views.all.len());
    println!("Latest versions:    {}", reconciled.views.latest.len());
    println!("Historic versions:  {}", reconciled.views.historic.len());
    print_keys("Without metadata", &reconciled.missing_metadata);
    print_keys("Without boundaries", &reconciled.missing_boundaries);

    if reconciled.missing_metadata.is_empty() && reconciled.missing_boundaries.is_empty() {
        println!();
        println!("Metadata and boundaries agree.");
    }
    Ok(())
}

fn print_keys(title: &str, keys: &[LayerKey]) {
    if keys.is_empty() {
        return;
    }
    println!();
    println!("{} ({}):", title, keys.len());
    for key in keys {
        println!("  {}", key);
    }
}
