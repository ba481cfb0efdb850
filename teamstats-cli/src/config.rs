//! Configuration loading for the teamstats binary.
//!
//! A TOML file is used when one is named (`--config` or `TEAMSTATS_CONFIG`);
//! otherwise every setting comes from the environment with defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use teamstats_core::StoreSettings;

/// Default location of the source-of-record file.
pub const DEFAULT_SOURCE_PATH: &str = "teams.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                field: "log_format",
                reason: format!("unknown format '{}' (expected pretty or json)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreSettings::default(),
            source_path: default_source_path(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_PATH)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Store(#[from] teamstats_core::ConfigError),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl AppConfig {
    /// Load from `path` when given, else from `TEAMSTATS_CONFIG`, else from
    /// the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(config_path_from_env);
        let config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment variables:
    /// - `TEAMSTATS_REDIS_*`: see [`StoreSettings::from_env`]
    /// - `TEAMSTATS_SOURCE_PATH` (default: `teams.json`)
    /// - `TEAMSTATS_LOG_FORMAT`: "pretty" or "json" (default: pretty)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreSettings::from_lookup(&lookup)?;
        let source_path = lookup("TEAMSTATS_SOURCE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_source_path);
        let log_format = match lookup("TEAMSTATS_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self {
            store,
            source_path,
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source_path",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("TEAMSTATS_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.source_path, PathBuf::from("teams.json"));
    }

    #[test]
    fn test_full_toml() {
        let config = AppConfig::from_toml(
            r#"
            source_path = "/var/lib/teamstats/teams.json"
            log_format = "json"

            [store]
            password = "secret"
            ssl = true
            sync_timeout_ms = 1500
            hosts = [
                { host = "primary.cache", port = 6380 },
                { host = "replica.cache", port = 6380 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.store.hosts.len(), 2);
        assert_eq!(config.store.hosts[1].host, "replica.cache");
        assert_eq!(config.store.sync_timeout_ms, 1500);
        assert!(config.store.enabled);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = AppConfig::from_toml("cache_size = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = AppConfig::from_toml("[store]\nretries = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_store_settings() {
        let config = AppConfig::from_toml("[store]\nhosts = []").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Store(_))));
    }

    #[test]
    fn test_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TEAMSTATS_REDIS_HOSTS", "cache-a:6379,cache-b"),
            ("TEAMSTATS_REDIS_ENABLED", "false"),
            ("TEAMSTATS_SOURCE_PATH", "data/league.json"),
            ("TEAMSTATS_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.store.hosts.len(), 2);
        assert!(!config.store.enabled);
        assert_eq!(config.source_path, PathBuf::from("data/league.json"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_log_format() {
        let err = AppConfig::from_lookup(lookup_from(&[("TEAMSTATS_LOG_FORMAT", "xml")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "log_format",
                ..
            }
        ));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::from_path(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
