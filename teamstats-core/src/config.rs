//! Remote store configuration
//!
//! Settings are read from a TOML section or from environment variables with
//! defaults suitable for a local development Redis.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single store endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostDetail {
    pub host: String,
    pub port: u16,
}

impl HostDetail {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`. A missing port defaults to 6379.
    ///
    /// IPv6 literals must be bracketed, as in `[::1]:6379` or `[::1]`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        let invalid = |reason: &str| ConfigError::InvalidValue {
            field: "hosts".to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let parse_port = |port: &str| {
            port.parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| invalid("port must be a number between 1 and 65535"))
        };

        let (host, port) = if let Some(bracketed) = value.strip_prefix('[') {
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in IPv6 host"))?;
            let port = match rest {
                "" => DEFAULT_PORT,
                _ => match rest.strip_prefix(':') {
                    Some(port) => parse_port(port)?,
                    None => return Err(invalid("expected ':' after ']'")),
                },
            };
            (host, port)
        } else {
            match value.split_once(':') {
                Some((_, port)) if port.contains(':') => {
                    return Err(invalid("IPv6 hosts must be written as [addr]:port"));
                }
                Some((host, port)) => (host, parse_port(port)?),
                None => (value, DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(invalid("host must not be empty"));
        }
        Ok(Self::new(host, port))
    }

    /// `host:port` as written in a connection URL, with IPv6 hosts bracketed.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;

/// Connection settings for the remote key/value + sorted-set store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Endpoints, tried in order when connecting.
    pub hosts: Vec<HostDetail>,
    pub password: Option<String>,
    pub database: i64,
    /// Connect over TLS.
    pub ssl: bool,
    /// Fail at start-up when no host is reachable. When false the connection
    /// is made lazily on the first round trip.
    pub abort_on_connect_fail: bool,
    /// Per round-trip timeout in milliseconds.
    pub sync_timeout_ms: u64,
    /// When false, cached strategies are served directly from the source.
    pub enabled: bool,
    /// COUNT hint for each SCAN iteration.
    pub scan_count: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            hosts: vec![HostDetail::new("127.0.0.1", DEFAULT_PORT)],
            password: None,
            database: 0,
            ssl: false,
            abort_on_connect_fail: false,
            sync_timeout_ms: 5000,
            enabled: true,
            scan_count: 250,
        }
    }
}

impl StoreSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `TEAMSTATS_REDIS_HOSTS`: comma-separated `host:port` list
    /// - `TEAMSTATS_REDIS_PASSWORD`
    /// - `TEAMSTATS_REDIS_DATABASE` (default: 0)
    /// - `TEAMSTATS_REDIS_SSL`: "true" or "false" (default: false)
    /// - `TEAMSTATS_REDIS_ABORT_ON_CONNECT_FAIL` (default: false)
    /// - `TEAMSTATS_REDIS_SYNC_TIMEOUT_MS` (default: 5000)
    /// - `TEAMSTATS_REDIS_ENABLED` (default: true)
    /// - `TEAMSTATS_REDIS_SCAN_COUNT` (default: 250)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let hosts = match lookup("TEAMSTATS_REDIS_HOSTS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(HostDetail::parse)
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.hosts,
        };

        let password = lookup("TEAMSTATS_REDIS_PASSWORD").filter(|p| !p.is_empty());

        let settings = Self {
            hosts,
            password,
            database: parse_var(&lookup, "TEAMSTATS_REDIS_DATABASE", defaults.database)?,
            ssl: flag_var(&lookup, "TEAMSTATS_REDIS_SSL", defaults.ssl),
            abort_on_connect_fail: flag_var(
                &lookup,
                "TEAMSTATS_REDIS_ABORT_ON_CONNECT_FAIL",
                defaults.abort_on_connect_fail,
            ),
            sync_timeout_ms: parse_var(
                &lookup,
                "TEAMSTATS_REDIS_SYNC_TIMEOUT_MS",
                defaults.sync_timeout_ms,
            )?,
            enabled: flag_var(&lookup, "TEAMSTATS_REDIS_ENABLED", defaults.enabled),
            scan_count: parse_var(&lookup, "TEAMSTATS_REDIS_SCAN_COUNT", defaults.scan_count)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values that can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "hosts".to_string(),
            });
        }
        for host in &self.hosts {
            if host.host.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "hosts.host".to_string(),
                    value: host.host.clone(),
                    reason: "must not be empty".to_string(),
                });
            }
            if host.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "hosts.port".to_string(),
                    value: "0".to_string(),
                    reason: "must be > 0".to_string(),
                });
            }
        }
        if self.sync_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.scan_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan_count".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.database < 0 {
            return Err(ConfigError::InvalidValue {
                field: "database".to_string(),
                value: self.database.to_string(),
                reason: "must be >= 0".to_string(),
            });
        }
        Ok(())
    }

    /// Per round-trip timeout.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.clone(),
            reason: "not a valid number".to_string(),
        }),
        None => Ok(default),
    }
}

fn flag_var<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|s| {
            let s = s.trim().to_lowercase();
            s == "true" || s == "1"
        })
        .unwrap_or(default)
}
