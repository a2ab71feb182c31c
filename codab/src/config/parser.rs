//! INI parsing logic for converting `Ini` → `PipelineConfig`.
//!
//! This module is the single place where INI key names are mapped to
//! struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::PipelineConfig;
use super::RunSteps;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Some(true),
        "no" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse an `Ini` object into a `PipelineConfig`.
///
/// Starts from `PipelineConfig::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<PipelineConfig, ConfigFileError> {
    let mut config = PipelineConfig::default();

    // [paths] section
    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = section.get("data_dir") {
            let v = v.trim();
            if !v.is_empty() {
                config.data_dir = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("gdal_bin") {
            let v = v.trim();
            if !v.is_empty() {
                config.gdal_bin = expand_tilde(v);
            }
        }
    }

    // [filter] section
    if let Some(section) = ini.section(Some("filter")) {
        if let Some(v) = section.get("iso3_include") {
            config.iso3.set_include(v);
        }
        if let Some(v) = section.get("iso3_exclude") {
            config.iso3.set_exclude(v);
        }
    }

    // [run] section
    if let Some(section) = ini.section(Some("run")) {
        let include = section.get("include").unwrap_or("");
        let exclude = section.get("exclude").unwrap_or("");
        config.steps = RunSteps::parse(include, exclude)
            .map_err(|reason| invalid("run", "include/exclude", &format!("{}|{}", include, exclude), &reason))?;
        if let Some(v) = section.get("tolerate_tool_failure") {
            config.tolerate_tool_failure = parse_bool(v)
                .ok_or_else(|| invalid("run", "tolerate_tool_failure", v, "must be true or false"))?;
        }
    }

    // [edge_match] section
    if let Some(section) = ini.section(Some("edge_match")) {
        if let Some(v) = section.get("distance") {
            let distance: f64 = v
                .trim()
                .parse()
                .map_err(|_| invalid("edge_match", "distance", v, "must be a number"))?;
            if !(distance.is_finite() && distance >= 0.0) {
                return Err(invalid("edge_match", "distance", v, "must be non-negative"));
            }
            config.edge_match.distance = distance;
        }
        if let Some(v) = section.get("threads") {
            let threads: usize = v
                .trim()
                .parse()
                .map_err(|_| invalid("edge_match", "threads", v, "must be a positive integer"))?;
            if threads == 0 {
                return Err(invalid("edge_match", "threads", v, "must be at least 1"));
            }
            config.edge_match.threads = threads;
        }
        if let Some(v) = section.get("area_epsilon") {
            config.edge_match.area_epsilon = v
                .trim()
                .parse()
                .map_err(|_| invalid("edge_match", "area_epsilon", v, "must be a number"))?;
        }
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        if let Some(v) = section.get("attempts") {
            let attempts: u32 = v
                .trim()
                .parse()
                .map_err(|_| invalid("retry", "attempts", v, "must be a positive integer"))?;
            if attempts == 0 {
                return Err(invalid("retry", "attempts", v, "must be at least 1"));
            }
            config.retry.attempts = attempts;
        }
        if let Some(v) = section.get("wait") {
            config.retry.wait_secs = v
                .trim()
                .parse()
                .map_err(|_| invalid("retry", "wait", v, "must be a number of seconds"))?;
        }
        if let Some(v) = section.get("timeout") {
            config.retry.timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| invalid("retry", "timeout", v, "must be a number of seconds"))?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunStep;

    fn parse(text: &str) -> Result<PipelineConfig, ConfigFileError> {
        let ini = Ini::load_from_str(text).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_is_default() {
        assert_eq!(parse("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_full_ini() {
        let config = parse(
            "[paths]\ndata_dir = /srv/codab\ngdal_bin = /opt/gdal/bin/gdal\n\
             [filter]\niso3_include = AFG,BDI\niso3_exclude = AFG_V01\n\
             [run]\nexclude = DOWNLOAD\ntolerate_tool_failure = yes\n\
             [edge_match]\ndistance = 0.0005\nthreads = 8\n\
             [retry]\nattempts = 3\nwait = 2\ntimeout = 30\n\
             [logging]\nfile = /var/log/codab.log\n",
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/codab"));
        assert_eq!(config.gdal_bin, PathBuf::from("/opt/gdal/bin/gdal"));
        assert_eq!(config.iso3.include_list(), "AFG,BDI");
        assert_eq!(config.iso3.exclude_list(), "AFG_V01");
        assert!(!config.steps.enabled(RunStep::Download));
        assert!(config.tolerate_tool_failure);
        assert_eq!(config.edge_match.distance, 0.0005);
        assert_eq!(config.edge_match.threads, 8);
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.wait_secs, 2);
        assert_eq!(config.retry.timeout_secs, 30);
        assert_eq!(config.logging.file, PathBuf::from("/var/log/codab.log"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = parse("[edge_match]\nthreads = 0\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { ref key, .. } if key == "threads"));
    }

    #[test]
    fn test_negative_distance_rejected() {
        assert!(parse("[edge_match]\ndistance = -1\n").is_err());
        assert!(parse("[edge_match]\ndistance = far\n").is_err());
    }

    #[test]
    fn test_unknown_run_step_rejected() {
        assert!(parse("[run]\ninclude = ALIGNED\n").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
