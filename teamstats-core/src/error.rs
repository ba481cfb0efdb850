//! Error types for team stats operations

use crate::TeamId;
use std::time::Duration;
use thiserror::Error;

/// Remote store (cache) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store operation {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Invalid key pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Build an `Unavailable` error from any transport failure.
    pub fn unavailable(reason: impl ToString) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    /// Returns true for transport failures and timeouts.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Source-of-record errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Team not found: {id}")]
    NotFound { id: TeamId },

    #[error("Concurrent modification of team {id}: expected revision {expected}, found {actual}")]
    ConcurrentModification {
        id: TeamId,
        expected: u64,
        actual: u64,
    },

    #[error("Team {id} already exists")]
    DuplicateId { id: TeamId },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Corrupt source data: {reason}")]
    Corrupt { reason: String },

    #[error("Source lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all team stats errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TeamStatsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TeamStatsError {
    /// Returns true when the remote store could not be reached in time.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unavailable())
    }

    /// Returns true when a source-of-record lookup found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Source(SourceError::NotFound { .. }))
    }

    /// Returns true when an update collided with a newer revision.
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::Source(SourceError::ConcurrentModification { .. }))
    }
}

/// Result type alias for team stats operations.
pub type TeamStatsResult<T> = Result<T, TeamStatsError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_timeout() {
        let err = StoreError::Timeout {
            operation: "ZRANGE",
            timeout: Duration::from_millis(250),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("ZRANGE"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_timeout_counts_as_unavailable() {
        let err: TeamStatsError = StoreError::Timeout {
            operation: "GET",
            timeout: Duration::from_secs(1),
        }
        .into();
        assert!(err.is_store_unavailable());

        let err: TeamStatsError = StoreError::unavailable("connection refused").into();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_serialization_is_not_unavailable() {
        let err: TeamStatsError = StoreError::Serialization {
            key: "team-1".to_string(),
            reason: "eof".to_string(),
        }
        .into();
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn test_source_error_display_concurrent_modification() {
        let err = SourceError::ConcurrentModification {
            id: TeamId::new(4),
            expected: 1,
            actual: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("team 4"));
        assert!(msg.contains("expected revision 1"));
        assert!(msg.contains("found 3"));
    }

    #[test]
    fn test_error_classification() {
        let not_found: TeamStatsError = SourceError::NotFound { id: TeamId::new(9) }.into();
        assert!(not_found.is_not_found());
        assert!(!not_found.is_concurrent_modification());
        assert!(!not_found.is_store_unavailable());
    }
}
