//! Run step selection.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Named steps of a run, selectable through the run include/exclude lists.
///
/// Umbrella steps (`ORIGINAL`, `EXTENDED_POST`, ...) enable all of their
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunStep {
    Download,
    DownloadMetadata,
    DownloadBoundaries,
    Original,
    OriginalBoundaries,
    OriginalPcodes,
    ExtendedPre,
    EdgeMatch,
    ExtendedPost,
    ExtendedPostCountry,
    ExtendedPostGlobal,
    Matched,
    MatchedCountry,
    MatchedGlobal,
    Dataset,
    DatasetSummary,
}

impl RunStep {
    pub const ALL: [RunStep; 16] = [
        RunStep::Download,
        RunStep::DownloadMetadata,
        RunStep::DownloadBoundaries,
        RunStep::Original,
        RunStep::OriginalBoundaries,
        RunStep::OriginalPcodes,
        RunStep::ExtendedPre,
        RunStep::EdgeMatch,
        RunStep::ExtendedPost,
        RunStep::ExtendedPostCountry,
        RunStep::ExtendedPostGlobal,
        RunStep::Matched,
        RunStep::MatchedCountry,
        RunStep::MatchedGlobal,
        RunStep::Dataset,
        RunStep::DatasetSummary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RunStep::Download => "DOWNLOAD",
            RunStep::DownloadMetadata => "DOWNLOAD_METADATA",
            RunStep::DownloadBoundaries => "DOWNLOAD_BOUNDARIES",
            RunStep::Original => "ORIGINAL",
            RunStep::OriginalBoundaries => "ORIGINAL_BOUNDARIES",
            RunStep::OriginalPcodes => "ORIGINAL_PCODES",
            RunStep::ExtendedPre => "EXTENDED_PRE",
            RunStep::EdgeMatch => "EDGE_MATCH",
            RunStep::ExtendedPost => "EXTENDED_POST",
            RunStep::ExtendedPostCountry => "EXTENDED_POST_COUNTRY",
            RunStep::ExtendedPostGlobal => "EXTENDED_POST_GLOBAL",
            RunStep::Matched => "MATCHED",
            RunStep::MatchedCountry => "MATCHED_COUNTRY",
            RunStep::MatchedGlobal => "MATCHED_GLOBAL",
            RunStep::Dataset => "DATASET",
            RunStep::DatasetSummary => "DATASET_SUMMARY",
        }
    }

    /// Umbrella step that also enables this one.
    pub fn umbrella(&self) -> Option<RunStep> {
        match self {
            RunStep::DownloadMetadata | RunStep::DownloadBoundaries => Some(RunStep::Download),
            RunStep::OriginalBoundaries | RunStep::OriginalPcodes => Some(RunStep::Original),
            RunStep::ExtendedPostCountry | RunStep::ExtendedPostGlobal => {
                Some(RunStep::ExtendedPost)
            }
            RunStep::MatchedCountry | RunStep::MatchedGlobal => Some(RunStep::Matched),
            RunStep::DatasetSummary => Some(RunStep::Dataset),
            _ => None,
        }
    }
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        RunStep::ALL
            .iter()
            .copied()
            .find(|step| step.name() == wanted)
            .ok_or_else(|| format!("unknown run step '{}'", s.trim()))
    }
}

/// Run include/exclude lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSteps {
    include: BTreeSet<RunStep>,
    exclude: BTreeSet<RunStep>,
}

impl RunSteps {
    /// Parse comma-separated step names; unknown names are an error.
    pub fn parse(include: &str, exclude: &str) -> Result<Self, String> {
        Ok(Self {
            include: parse_list(include)?,
            exclude: parse_list(exclude)?,
        })
    }

    /// Whether a step name passes both lists on its own.
    pub fn can_run(&self, step: RunStep) -> bool {
        (self.include.is_empty() || self.include.contains(&step))
            && (self.exclude.is_empty() || !self.exclude.contains(&step))
    }

    /// Whether a step runs, taking its umbrella into account.
    ///
    /// Including an umbrella includes its children; excluding an umbrella
    /// excludes them.
    pub fn enabled(&self, step: RunStep) -> bool {
        let umbrella = step.umbrella();
        let included = self.include.is_empty()
            || self.include.contains(&step)
            || umbrella.is_some_and(|u| self.include.contains(&u));
        let excluded =
            self.exclude.contains(&step) || umbrella.is_some_and(|u| self.exclude.contains(&u));
        included && !excluded
    }

    pub fn include_list(&self) -> String {
        join(&self.include)
    }

    pub fn exclude_list(&self) -> String {
        join(&self.exclude)
    }
}

fn parse_list(list: &str) -> Result<BTreeSet<RunStep>, String> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

fn join(steps: &BTreeSet<RunStep>) -> String {
    steps.iter().map(RunStep::name).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_runs_by_default() {
        let steps = RunSteps::default();
        for step in RunStep::ALL {
            assert!(steps.enabled(step), "{} should run", step);
        }
    }

    #[test]
    fn test_umbrella_enables_children() {
        let steps = RunSteps::parse("ORIGINAL", "").unwrap();
        assert!(steps.enabled(RunStep::OriginalBoundaries));
        assert!(steps.enabled(RunStep::OriginalPcodes));
        assert!(!steps.enabled(RunStep::MatchedGlobal));
    }

    #[test]
    fn test_child_only() {
        let steps = RunSteps::parse("matched_global", "").unwrap();
        assert!(steps.enabled(RunStep::MatchedGlobal));
        assert!(!steps.enabled(RunStep::MatchedCountry));
    }

    #[test]
    fn test_exclude_list() {
        let steps = RunSteps::parse("", "DOWNLOAD,DATASET").unwrap();
        assert!(!steps.enabled(RunStep::Download));
        assert!(steps.enabled(RunStep::ExtendedPre));
        assert!(!steps.enabled(RunStep::DownloadMetadata));
        assert!(!steps.enabled(RunStep::DatasetSummary));
        // The raw name check ignores umbrellas.
        assert!(steps.can_run(RunStep::DownloadMetadata));
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(RunSteps::parse("ALIGNED", "").is_err());
    }

    #[test]
    fn test_lists_round_trip() {
        let steps = RunSteps::parse("original,matched", "").unwrap();
        assert_eq!(steps.include_list(), "ORIGINAL,MATCHED");
        assert_eq!(RunSteps::parse(&steps.include_list(), "").unwrap(), steps);
    }
}
