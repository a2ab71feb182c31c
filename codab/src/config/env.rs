//! Environment overlay using the variable names operators already know.

use super::file::ConfigFileError;
use super::parser::{expand_tilde, parse_bool};
use super::settings::PipelineConfig;
use super::RunSteps;

fn invalid(key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: "env".to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "must be a number"))
}

/// Overlay values from the process environment.
pub fn apply_process_env(config: PipelineConfig) -> Result<PipelineConfig, ConfigFileError> {
    apply_env(config, |key| std::env::var(key).ok())
}

/// Overlay values from an arbitrary variable lookup.
///
/// Unset or empty variables leave the current value in place.
pub fn apply_env<F>(mut config: PipelineConfig, lookup: F) -> Result<PipelineConfig, ConfigFileError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("DATA_DIR") {
        config.data_dir = expand_tilde(v.trim());
    }
    if let Some(v) = get("GDAL_BIN") {
        config.gdal_bin = expand_tilde(v.trim());
    }
    if let Some(v) = get("ISO3_INCLUDE") {
        config.iso3.set_include(&v);
    }
    if let Some(v) = get("ISO3_EXCLUDE") {
        config.iso3.set_exclude(&v);
    }

    let include = get("RUN_INCLUDE");
    let exclude = get("RUN_EXCLUDE");
    if include.is_some() || exclude.is_some() {
        let include = include.unwrap_or_else(|| config.steps.include_list());
        let exclude = exclude.unwrap_or_else(|| config.steps.exclude_list());
        config.steps = RunSteps::parse(&include, &exclude)
            .map_err(|reason| invalid("RUN_INCLUDE/RUN_EXCLUDE", &format!("{}|{}", include, exclude), &reason))?;
    }

    if let Some(v) = get("TOLERATE_TOOL_FAILURE") {
        config.tolerate_tool_failure =
            parse_bool(&v).ok_or_else(|| invalid("TOLERATE_TOOL_FAILURE", &v, "must be boolean-like"))?;
    }
    if let Some(v) = get("DISTANCE") {
        let distance: f64 = parse_number("DISTANCE", &v)?;
        if !(distance.is_finite() && distance >= 0.0) {
            return Err(invalid("DISTANCE", &v, "must be non-negative"));
        }
        config.edge_match.distance = distance;
    }
    if let Some(v) = get("NUM_THREADS") {
        let threads: usize = parse_number("NUM_THREADS", &v)?;
        if threads == 0 {
            return Err(invalid("NUM_THREADS", &v, "must be at least 1"));
        }
        config.edge_match.threads = threads;
    }
    if let Some(v) = get("ATTEMPT") {
        let attempts: u32 = parse_number("ATTEMPT", &v)?;
        if attempts == 0 {
            return Err(invalid("ATTEMPT", &v, "must be at least 1"));
        }
        config.retry.attempts = attempts;
    }
    if let Some(v) = get("WAIT") {
        config.retry.wait_secs = parse_number("WAIT", &v)?;
    }
    if let Some(v) = get("TIMEOUT") {
        config.retry.timeout_secs = parse_number("TIMEOUT", &v)?;
    }

    Ok(config)
}
