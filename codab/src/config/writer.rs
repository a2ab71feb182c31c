//! Serialization of `PipelineConfig` back to INI text.

use ini::Ini;

use super::settings::PipelineConfig;

/// Render a configuration as INI text that [`PipelineConfig::load_from`] reads back.
pub fn to_config_string(config: &PipelineConfig) -> String {
    let ini = to_ini(config);
    let mut buffer = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = ini.write_to(&mut buffer);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Effective value of a `section.key` setting, e.g. `edge_match.distance`.
pub fn config_value(config: &PipelineConfig, key: &str) -> Option<String> {
    let (section, name) = key.split_once('.')?;
    to_ini(config)
        .get_from(Some(section), name)
        .map(str::to_string)
}

fn to_ini(config: &PipelineConfig) -> Ini {
    let mut ini = Ini::new();

    ini.with_section(Some("paths"))
        .set("data_dir", config.data_dir.display().to_string())
        .set("gdal_bin", config.gdal_bin.display().to_string());

    ini.with_section(Some("filter"))
        .set("iso3_include", config.iso3.include_list())
        .set("iso3_exclude", config.iso3.exclude_list());

    ini.with_section(Some("run"))
        .set("include", config.steps.include_list())
        .set("exclude", config.steps.exclude_list())
        .set(
            "tolerate_tool_failure",
            config.tolerate_tool_failure.to_string(),
        );

    ini.with_section(Some("edge_match"))
        .set("distance", config.edge_match.distance.to_string())
        .set("threads", config.edge_match.threads.to_string())
        .set("area_epsilon", config.edge_match.area_epsilon.to_string());

    ini.with_section(Some("retry"))
        .set("attempts", config.retry.attempts.to_string())
        .set("wait", config.retry.wait_secs.to_string())
        .set("timeout", config.retry.timeout_secs.to_string());

    ini.with_section(Some("logging"))
        .set("file", config.logging.file.display().to_string());

    ini
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_every_section() {
        let text = to_config_string(&PipelineConfig::default());
        for section in ["[paths]", "[filter]", "[run]", "[edge_match]", "[retry]", "[logging]"] {
            assert!(text.contains(section), "missing {}", section);
        }
        assert!(text.contains("distance=0.0002"));
        assert!(text.contains("threads=1"));
    }

    #[test]
    fn test_config_value() {
        let config = PipelineConfig::default().with_threads(3);
        assert_eq!(config_value(&config, "edge_match.threads").as_deref(), Some("3"));
        assert_eq!(config_value(&config, "edge_match.missing"), None);
        assert_eq!(config_value(&config, "threads"), None);
    }
}
