//! Processing stages and version scopes.

use std::fmt;
use std::str::FromStr;

use super::{AdminLevel, MAX_EXTENDED_LEVEL, MAX_LEVEL};

/// Processing stage of the boundary pipeline.
///
/// Stages are strictly ordered: extended depends on the full level resolved
/// from original, and matched clips the extended output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessingStage {
    /// Unmodified source layers.
    Original,
    /// Hierarchy padded so every level 0-4 exists.
    Extended,
    /// Edge-matched and clipped to the reference country polygons.
    Matched,
}

impl ProcessingStage {
    /// All stages in execution order.
    pub const ALL: [ProcessingStage; 3] = [
        ProcessingStage::Original,
        ProcessingStage::Extended,
        ProcessingStage::Matched,
    ];

    /// Directory name of this stage under `country/` and `global/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Original => "original",
            ProcessingStage::Extended => "extended",
            ProcessingStage::Matched => "matched",
        }
    }

    /// Deepest level merged into global outputs for this stage.
    pub fn max_merge_level(&self) -> AdminLevel {
        match self {
            ProcessingStage::Original => MAX_LEVEL,
            ProcessingStage::Extended | ProcessingStage::Matched => MAX_EXTENDED_LEVEL,
        }
    }

    /// Whether the global merge repairs the coverage between countries.
    pub fn cleans_coverage(&self) -> bool {
        matches!(self, ProcessingStage::Matched)
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(ProcessingStage::Original),
            "extended" => Ok(ProcessingStage::Extended),
            "matched" => Ok(ProcessingStage::Matched),
            other => Err(format!("unknown processing stage '{}'", other)),
        }
    }
}

/// Which versions of each country a global merge includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionScope {
    /// Only the most recent version per country.
    Latest,
    /// Every version of every country.
    All,
}

impl VersionScope {
    pub const BOTH: [VersionScope; 2] = [VersionScope::Latest, VersionScope::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionScope::Latest => "latest",
            VersionScope::All => "all",
        }
    }
}

impl fmt::Display for VersionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(ProcessingStage::Original < ProcessingStage::Extended);
        assert!(ProcessingStage::Extended < ProcessingStage::Matched);
    }

    #[test]
    fn test_merge_levels() {
        assert_eq!(ProcessingStage::Original.max_merge_level(), 5);
        assert_eq!(ProcessingStage::Extended.max_merge_level(), 4);
        assert_eq!(ProcessingStage::Matched.max_merge_level(), 4);
    }

    #[test]
    fn test_only_matched_cleans_coverage() {
        assert!(!ProcessingStage::Original.cleans_coverage());
        assert!(!ProcessingStage::Extended.cleans_coverage());
        assert!(ProcessingStage::Matched.cleans_coverage());
    }

    #[test]
    fn test_parse_stage() {
        assert_eq!(
            "Matched".parse::<ProcessingStage>().unwrap(),
            ProcessingStage::Matched
        );
        assert!("aligned".parse::<ProcessingStage>().is_err());
    }
}
