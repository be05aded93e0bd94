use super::models::AlignerConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AlignerConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AlignerConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AlignerConfig::default()
        }
    }
}

/// Parse the grouped-table TOML form into a sanitized flat config.
pub fn parse_config(contents: &str) -> Result<AlignerConfig, toml::de::Error> {
    let tables = toml::from_str::<ConfigTables>(contents)?;
    Ok(AlignerConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &AlignerConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").expect("empty toml parses");
        assert_eq!(config, AlignerConfig::default());
    }

    #[test]
    fn grouped_tables_override_flat_fields() {
        let config = parse_config(
            r#"
            [matching]
            search_radius = 15
            exact_threshold = 0.25

            [timing]
            offset_ms = -120

            [logging]
            log_level = "info"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.search_radius, 15);
        assert!((config.exact_threshold - 0.25).abs() < 1e-12);
        assert_eq!(config.offset_ms, -120);
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.context_radius, 5);
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = AlignerConfig {
            gap_words_per_sec: 3.5,
            offset_ms: 250,
            ..AlignerConfig::default()
        };
        let text = serialize_config(&config).expect("serializes");
        assert!(text.contains("[highlight]"));
        let parsed = parse_config(&text).expect("parses");
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/listen-along/config.toml"));
        assert_eq!(config, AlignerConfig::default());
    }
}
