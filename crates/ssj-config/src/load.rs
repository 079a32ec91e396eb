use std::path::{Path, PathBuf};

use ssj_platform::{DefaultPaths, PlatformPaths};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Written to a freshly created global config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# ssj configuration
# Uncomment and edit settings below to override defaults.

# [connection]
# host = "localhost"
# port = 1208
# connect_timeout_ms = 5000
# handshake_timeout_ms = 5000

# [watermark]
# text = "ssj"
# color = 0xFFFF00FF

# [display]
# listing_context = 5
# show_all_properties = false

# [log]
# level = "info"
# file = "/path/to/ssj.log"
"#;

/// Load and merge configuration.
///
/// 1. Reads `config_dir/config.toml`, creating it with commented-out
///    defaults when missing.
/// 2. Looks for `.ssj/config.toml` in `project_dir` and its ancestors.
/// 3. Merges `Config::default() <- global <- project` and validates.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or the first
/// validation failure.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)?;
    }
    if !global_path.exists() {
        std::fs::write(&global_path, DEFAULT_CONFIG_CONTENT)
            .map_err(|e| ConfigError::CreateDefault(e.to_string()))?;
        tracing::info!("created default config at {}", global_path.display());
    }

    let mut config = Config::default();

    let global_content = std::fs::read_to_string(&global_path)?;
    if has_non_comment_content(&global_content) {
        config = merge_configs(&config, &global_content)?;
    }

    if let Some(project_path) = project_dir.and_then(find_project_config) {
        tracing::debug!("applying project config {}", project_path.display());
        let project_content = std::fs::read_to_string(&project_path)?;
        config = merge_configs(&config, &project_content)?;
    }

    check(&config)?;
    Ok(config)
}

/// [`load_config`] with the per-user config directory and the current
/// working directory as the project root.
pub fn load_default() -> Result<Config, ConfigError> {
    let paths = DefaultPaths::new()?;
    let cwd = std::env::current_dir().ok();
    load_config(&paths.config_dir(), cwd.as_deref())
}

/// Parse a TOML string directly into a validated [`Config`].
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    check(&config)?;
    Ok(config)
}

fn check(config: &Config) -> Result<(), ConfigError> {
    validate(config).map_err(|errors| {
        errors
            .into_iter()
            .next()
            .unwrap_or_else(|| ConfigError::Validation {
                field: "unknown".to_string(),
                message: "validation failed".to_string(),
            })
    })
}

/// Walk from `start` upward looking for `.ssj/config.toml`.
fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".ssj").join("config.toml"))
        .find(|candidate| candidate.exists())
}

fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_config_creates_default_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config, Config::default());
        assert!(cfg_dir.join("config.toml").exists());
    }

    #[test]
    fn load_config_reads_existing_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[connection]\nhost = \"10.0.0.2\"\n").unwrap();

        let config = load_config(&cfg_dir, None).unwrap();
        assert_eq!(config.connection.host, "10.0.0.2");
        assert_eq!(config.connection.port, 1208);
    }

    #[test]
    fn load_config_merges_project_over_global() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "[connection]\nport = 2000\n[watermark]\ntext = \"global\"\n",
        )
        .unwrap();

        let project = tmp.path().join("game");
        std::fs::create_dir_all(project.join(".ssj")).unwrap();
        std::fs::write(project.join(".ssj").join("config.toml"), "[connection]\nport = 2001\n")
            .unwrap();
        let deep = project.join("scripts").join("battle");
        std::fs::create_dir_all(&deep).unwrap();

        let config = load_config(&cfg_dir, Some(&deep)).unwrap();
        assert_eq!(config.connection.port, 2001);
        assert_eq!(config.watermark.text, "global");
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let cfg_dir = tmp.path().join("config");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[display]\nlisting_context = 500\n").unwrap();

        let err = load_config(&cfg_dir, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "display.listing_context"));
    }

    #[test]
    fn load_from_str_parses_and_validates() {
        let config = load_from_str("[log]\nlevel = \"trace\"\n").unwrap();
        assert_eq!(config.log.level, crate::config::LogLevel::Trace);
        assert!(load_from_str("{{bad}}").is_err());
        assert!(load_from_str("[connection]\nport = 0\n").is_err());
    }

    #[test]
    fn default_config_content_is_comments_only() {
        assert!(!has_non_comment_content(DEFAULT_CONFIG_CONTENT));
        assert!(has_non_comment_content("# comment\nport = 4\n"));
    }

    #[test]
    fn default_config_content_uncommented_is_valid() {
        let uncommented: String = DEFAULT_CONFIG_CONTENT
            .lines()
            .filter_map(|l| l.strip_prefix("# "))
            .filter(|l| l.starts_with('[') || l.contains(" = "))
            .filter(|l| !l.starts_with("file"))
            .map(|l| format!("{l}\n"))
            .collect();
        assert_eq!(load_from_str(&uncommented).unwrap(), Config::default());
    }
}
