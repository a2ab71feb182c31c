//! Resolve command - show which admin level file is the full-coverage layer.

use std::path::PathBuf;

use codab::model::LayerKey;

use super::common::ConfigOverrides;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the resolve command for one ISO3 code and version.
pub fn run(
    config: Option<PathBuf>,
    overrides: ConfigOverrides,
    iso3: &str,
    version: &str,
    debug: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config.as_deref(), &overrides, debug)?;
    runner.log_startup("resolve");

    let reconciled = runner.create_pipeline().reconcile()?;
    let key = LayerKey::new(iso3, version);
    let resolved = reconciled.resolver().resolve(&key)?;

    println!("{}: {}", resolved.key, resolved.resolution);
    println!("  {}", resolved.path.display());
    Ok(())
}
