//! Error types for the binary.

use crate::config::ConfigError;
use teamstats_core::TeamStatsError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    TeamStats(#[from] TeamStatsError),
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
}

impl CliError {
    /// Returns true when the failure was the cache store being unreachable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::TeamStats(e) if e.is_store_unavailable())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::TeamStats(e) if e.is_store_unavailable() => 3,
            Self::TeamStats(e) if e.is_not_found() => 4,
            Self::TeamStats(e) if e.is_concurrent_modification() => 5,
            _ => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use teamstats_core::{SourceError, StoreError, TeamId};

    #[test]
    fn test_exit_codes() {
        let unavailable: CliError = TeamStatsError::from(StoreError::unavailable("refused")).into();
        assert!(unavailable.is_store_unavailable());
        assert_eq!(unavailable.exit_code(), 3);

        let missing: CliError =
            TeamStatsError::from(SourceError::NotFound { id: TeamId::new(4) }).into();
        assert_eq!(missing.exit_code(), 4);

        let stale: CliError = TeamStatsError::from(SourceError::ConcurrentModification {
            id: TeamId::new(4),
            expected: 1,
            actual: 2,
        })
        .into();
        assert_eq!(stale.exit_code(), 5);

        let config: CliError = ConfigError::InvalidValue {
            field: "log_format",
            reason: "unknown format".to_string(),
        }
        .into();
        assert_eq!(config.exit_code(), 2);

        let telemetry = CliError::Telemetry("already set".to_string());
        assert_eq!(telemetry.exit_code(), 1);
    }
}
