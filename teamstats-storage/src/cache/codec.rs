//! Wire encoding for stored values.
//!
//! Values are stored as JSON bytes. Encoding is deterministic for a given
//! value, which keeps sorted-set members stable: re-adding the same team
//! updates its score instead of creating a second member.

use teamstats_core::{StoreError, TeamStatsResult};

use super::traits::CacheValue;

/// Encode a value for storage under `key`.
pub(crate) fn encode<T: CacheValue>(key: &str, value: &T) -> TeamStatsResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Decode a stored payload. A stored JSON `null` decodes to `None`.
pub(crate) fn decode<T: CacheValue>(key: &str, bytes: &[u8]) -> TeamStatsResult<Option<T>> {
    serde_json::from_slice::<Option<T>>(bytes).map_err(|e| {
        StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Decode a payload fetched by a pattern read, dropping anything that is
/// null or undecodable.
pub(crate) fn decode_lenient<T: CacheValue>(key: &str, bytes: &[u8]) -> Option<T> {
    match decode(key, bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Dropping undecodable cache entry");
            None
        }
    }
}
