//! Run command - execute every enabled pipeline step.

use std::path::PathBuf;

use codab::fetch::MirrorFetcher;
use tracing::info;

use super::common::ConfigOverrides;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
#[derive(Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    /// Local mirror enabling the download steps.
    pub mirror: Option<PathBuf>,
    pub debug: bool,
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), &args.overrides, args.debug)?;
    runner.log_startup("run");

    let mut pipeline = runner.create_pipeline();
    if let Some(mirror) = args.mirror.as_deref() {
        info!(mirror = %mirror.display(), "downloading from mirror");
        pipeline = pipeline.with_fetcher(MirrorFetcher::new(mirror));
    }

    let report = pipeline.run()?;
    println!("{}", report);

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::Unclean {
            topology_failures: report.topology_failures.len(),
        })
    }
}
