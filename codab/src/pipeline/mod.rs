//! Pipeline orchestration.
//!
//! Runs every enabled step strictly in sequence:
//!
//! ```text
//! DOWNLOAD_METADATA → DOWNLOAD_BOUNDARIES → (reconcile)
//!   → ORIGINAL_BOUNDARIES → ORIGINAL_PCODES
//!   → EXTENDED_PRE → EDGE_MATCH → EXTENDED_POST_COUNTRY → EXTENDED_POST_GLOBAL
//!   → MATCHED_COUNTRY → MATCHED_GLOBAL → DATASET_SUMMARY
//! ```
//!
//! Reconciliation always runs; a fatal error there halts the run before
//! any stage. Per-file failures are collected into the [`RunReport`].
//!
//! Outputs derived from a key are removed before the key is staged again,
//! and again when it fails, so a layer rejected by this run is never
//! merged from an earlier run's files.

mod outcome;
mod report;

pub use outcome::{StageOutcome, UnitFailure};
pub use report::{RunReport, SkippedUnit};

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::catalog::{remove_layer_dir, Catalog};
use crate::clip::Clipper;
use crate::config::{PipelineConfig, RunStep};
use crate::edge_match::EdgeMatcher;
use crate::error::PipelineError;
use crate::extend::{extend_staged, remove_staged, ExtensionPreprocessor};
use crate::fetch::{Downloader, Fetcher};
use crate::geometry::{GeometryService, TopologyStore};
use crate::merge::Merger;
use crate::metadata::{normalize, read_source, write_views, MetadataReconciler, MetadataViews};
use crate::model::{LayerKey, ProcessingStage};
use crate::pcodes::{PcodeExtractor, PcodeTables};
use crate::resolver::AdminLevelResolver;
use crate::retry::RetryPolicy;
use crate::summary::{DatasetSummary, SUMMARY_FILE};

const EXTENDED_PRE_DIR: &str = "extended_pre";
const EXTENDED_POST_DIR: &str = "extended_post";

/// Reconciled metadata and the catalog it was checked against.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub views: MetadataViews,
    pub catalog: Catalog,
    pub missing_metadata: Vec<LayerKey>,
    pub missing_boundaries: Vec<LayerKey>,
}

impl Reconciled {
    pub fn resolver(&self) -> AdminLevelResolver<'_> {
        AdminLevelResolver::new(&self.views, &self.catalog)
    }
}

pub struct Pipeline<S> {
    config: PipelineConfig,
    service: S,
    fetcher: Option<Box<dyn Fetcher>>,
}

impl<S: GeometryService + TopologyStore> Pipeline<S> {
    pub fn new(config: PipelineConfig, service: S) -> Self {
        Self {
            config,
            service,
            fetcher: None,
        }
    }

    /// Enable the download steps with this transport.
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn enabled(&self, step: RunStep) -> bool {
        let enabled = self.config.steps.enabled(step);
        if !enabled {
            info!(step = %step, "step disabled");
        }
        enabled
    }

    /// Read, normalise and reconcile the metadata table with `country/original`.
    pub fn reconcile(&self) -> Result<Reconciled, PipelineError> {
        let records = read_source(&self.config.metadata_source())?;
        let records = normalize(records, &self.config.iso3);
        let catalog =
            Catalog::scan(&self.config.country_dir(ProcessingStage::Original.as_str()))?
                .filtered(&self.config.iso3);
        info!(
            records = records.len(),
            layers = catalog.len(),
            "reconciling metadata"
        );

        let reconciliation = MetadataReconciler::new(&self.service).reconcile(records, &catalog);
        let views = MetadataViews::build(reconciliation.records);
        if !views.is_partition() {
            error!("metadata views are not a partition of the full table");
        }
        Ok(Reconciled {
            views,
            catalog,
            missing_metadata: reconciliation.missing_metadata,
            missing_boundaries: reconciliation.missing_boundaries,
        })
    }

    fn stage_catalog(&self, stage: ProcessingStage) -> Result<Catalog, PipelineError> {
        Ok(Catalog::scan(&self.config.country_dir(stage.as_str()))?.filtered(&self.config.iso3))
    }

    fn download(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        let Some(fetcher) = self.fetcher.as_deref() else {
            return Ok(());
        };
        let downloader = Downloader::new(fetcher, RetryPolicy::from_settings(&self.config.retry));
        if self.enabled(RunStep::DownloadMetadata) {
            downloader.download_metadata(&self.config.metadata_source())?;
            report.steps.push(RunStep::DownloadMetadata);
        }
        if self.enabled(RunStep::DownloadBoundaries) {
            let outcome = downloader.download_boundaries(
                &self.config.country_dir(ProcessingStage::Original.as_str()),
                &self.config.iso3,
            );
            report.record(RunStep::DownloadBoundaries, outcome);
        }
        Ok(())
    }

    /// Run every enabled step. Only fatal errors are returned as `Err`.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();
        self.download(&mut report)?;

        let reconciled = self.reconcile()?;
        report.missing_metadata = reconciled.missing_metadata.clone();
        report.missing_boundaries = reconciled.missing_boundaries.clone();
        match write_views(&self.config.metadata_dir(), &reconciled.views) {
            Ok(paths) => report.files_written += paths.len(),
            Err(e) => report.record_failure(RunStep::Original, "metadata views", &PipelineError::from(e)),
        }

        let merger = Merger::new(&self.service, &self.config);
        if self.enabled(RunStep::OriginalBoundaries) {
            let outcome = merger.merge_stage(ProcessingStage::Original, &reconciled.catalog);
            report.record(RunStep::OriginalBoundaries, outcome);
        }

        let mut pcodes: Option<PcodeTables> = None;
        if self.enabled(RunStep::OriginalPcodes) {
            let extractor = PcodeExtractor::new(
                &self.service,
                self.config.global_dir(ProcessingStage::Original.as_str(), "latest"),
                self.config.pcodes_dir(),
            );
            let mut outcome = StageOutcome::default();
            match extractor.run() {
                Ok(tables) => {
                    outcome.written.extend(tables.written.iter().cloned());
                    pcodes = Some(tables);
                }
                Err(e) => outcome.record("p-codes", Err(e)),
            }
            report.record(RunStep::OriginalPcodes, outcome);
        }

        let pre_dir = self.config.country_dir(EXTENDED_PRE_DIR);
        let post_dir = self.config.country_dir(EXTENDED_POST_DIR);
        if self.enabled(RunStep::ExtendedPre) {
            let mut outcome = StageOutcome::default();
            for key in reconciled.catalog.keys() {
                if let Err(e) = self.clear_derived(key, &[pre_dir.as_path(), post_dir.as_path()]) {
                    outcome.record(key.to_string(), Err(e.into()));
                }
            }
            let preprocessor = ExtensionPreprocessor::new(&self.service, &pre_dir);
            outcome.absorb(preprocessor.run(&reconciled.catalog, &reconciled.resolver()));
            report.record(RunStep::ExtendedPre, outcome);
        }

        let edge_matched = self.enabled(RunStep::EdgeMatch);
        if edge_matched {
            let matcher = EdgeMatcher::from_config(&self.service, &self.config);
            let matched = matcher.run(&pre_dir, &post_dir);
            let failed_keys = matched.failed_keys();
            let mut outcome = matched.into_outcome();
            for key in &failed_keys {
                if let Err(e) = self.clear_derived(key, &[post_dir.as_path()]) {
                    outcome.record(key.to_string(), Err(e.into()));
                }
            }
            report.record(RunStep::EdgeMatch, outcome);
        }

        if self.enabled(RunStep::ExtendedPostCountry) {
            let source: PathBuf = if edge_matched { post_dir } else { pre_dir };
            let outcome = extend_staged(
                &self.service,
                &source,
                &self.config.country_dir(ProcessingStage::Extended.as_str()),
            );
            report.record(RunStep::ExtendedPostCountry, outcome);
        }

        if self.enabled(RunStep::ExtendedPostGlobal) {
            self.merge_step(&merger, ProcessingStage::Extended, RunStep::ExtendedPostGlobal, &mut report);
        }

        if self.enabled(RunStep::MatchedCountry) {
            match self.stage_catalog(ProcessingStage::Extended) {
                Ok(catalog) => {
                    let matched_dir = self.config.country_dir(ProcessingStage::Matched.as_str());
                    let mut outcome = self.prune_matched(&catalog);
                    let clipper = Clipper::new(&self.service, self.config.reference_polygons());
                    outcome.absorb(clipper.run(&catalog, &matched_dir));
                    report.record(RunStep::MatchedCountry, outcome);
                }
                Err(e) => report.record_failure(RunStep::MatchedCountry, "country/extended", &e),
            }
        }

        if self.enabled(RunStep::MatchedGlobal) {
            self.merge_step(&merger, ProcessingStage::Matched, RunStep::MatchedGlobal, &mut report);
        }

        if self.enabled(RunStep::DatasetSummary) {
            let summary = DatasetSummary::build(
                &reconciled.views.latest,
                pcodes.as_ref().map(|t| t.rows.as_slice()),
                Utc::now(),
            );
            let mut outcome = StageOutcome::default();
            let path = self.config.data_dir.join(SUMMARY_FILE);
            outcome.record(SUMMARY_FILE, summary.write(&path).map(|()| vec![path]));
            report.record(RunStep::DatasetSummary, outcome);
        }

        if report.is_clean() {
            info!(
                steps = report.steps.len(),
                files = report.files_written,
                skipped = report.failure_count(),
                "run finished"
            );
        } else {
            warn!(
                topology_failures = report.topology_failures.len(),
                "run finished with topology failures"
            );
        }
        Ok(report)
    }

    /// Remove everything derived from `key`: its staged files in `staging`
    /// and its extended and matched hierarchies.
    fn clear_derived(&self, key: &LayerKey, staging: &[&Path]) -> std::io::Result<()> {
        for dir in staging {
            remove_staged(dir, key)?;
        }
        for stage in [ProcessingStage::Extended, ProcessingStage::Matched] {
            if remove_layer_dir(&self.config.country_dir(stage.as_str()), key)? {
                info!(key = %key, %stage, "removed previous output");
            }
        }
        Ok(())
    }

    /// Remove matched hierarchies whose extended source no longer exists.
    fn prune_matched(&self, extended: &Catalog) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        let matched_dir = self.config.country_dir(ProcessingStage::Matched.as_str());
        let matched = match self.stage_catalog(ProcessingStage::Matched) {
            Ok(matched) => matched,
            Err(e) => {
                outcome.record("country/matched", Err(e));
                return outcome;
            }
        };
        for key in matched.keys().filter(|key| extended.get(key).is_none()) {
            match remove_layer_dir(&matched_dir, key) {
                Ok(_) => info!(key = %key, "removed matched layers without extended source"),
                Err(e) => outcome.record(key.to_string(), Err(e.into())),
            }
        }
        outcome
    }

    fn merge_step(
        &self,
        merger: &Merger<'_, S>,
        stage: ProcessingStage,
        step: RunStep,
        report: &mut RunReport,
    ) {
        match self.stage_catalog(stage) {
            Ok(catalog) => report.record(step, merger.merge_stage(stage, &catalog)),
            Err(e) => report.record_failure(step, format!("country/{}", stage), &e),
        }
    }
}
