//! Store client trait and cacheable value marker.
//!
//! This module defines the contract every remote key/value + sorted-set
//! store must satisfy to back the cache-aside layer.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use teamstats_core::TeamStatsResult;

/// Marker trait for values that can be written to and read from the store.
///
/// Blanket-implemented for every owned serde type that is safe to move
/// across tasks.
pub trait CacheValue: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Direction of a sorted-set range read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lowest score first.
    #[default]
    Ascending,
    /// Highest score first.
    Descending,
}

/// Rank meaning "through the last member" when used as a stop rank.
pub const LAST_RANK: isize = -1;

/// Typed access to a remote key/value + sorted-set store.
///
/// # Absence
///
/// A missing key is a normal outcome: `get` returns `Ok(None)`, pattern reads
/// return an empty collection and range reads return an empty sequence.
/// Only transport failures (connection loss, timeout) are errors, reported as
/// `StoreError::Unavailable` or `StoreError::Timeout`.
///
/// # Atomicity
///
/// `put` and `sorted_set_add` must be atomic for a single key/member. No
/// atomicity is promised across calls.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read and decode the value stored under `key`.
    async fn get<T: CacheValue>(&self, key: &str) -> TeamStatsResult<Option<T>>;

    /// Unconditionally overwrite `key`. Without a `ttl` the entry lives until
    /// it is removed.
    async fn put<T: CacheValue>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> TeamStatsResult<()>;

    /// Remove a single key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> TeamStatsResult<()>;

    /// Remove every key matching the glob `pattern`.
    ///
    /// Keys are discovered with an incremental scan and deleted in one batch.
    /// Returns the number of keys removed (zero matches is fine).
    async fn remove_by_pattern(&self, pattern: &str) -> TeamStatsResult<u64>;

    /// Read every value whose key matches the glob `pattern`.
    ///
    /// Keys are discovered with an incremental scan and fetched with a single
    /// multi-get. Keys that vanished between the scan and the fetch, or that
    /// hold no decodable value, are left out of the result.
    async fn get_by_pattern<T: CacheValue>(&self, pattern: &str) -> TeamStatsResult<Vec<T>>;

    /// Insert `member` into the sorted set at `key`, replacing its score if
    /// it is already present.
    async fn sorted_set_add<T: CacheValue>(
        &self,
        key: &str,
        member: &T,
        score: f64,
    ) -> TeamStatsResult<()>;

    /// Read members by rank, inclusive on both ends.
    ///
    /// Negative ranks count from the end, so `stop = -1` means "through the
    /// last member". A missing key yields an empty sequence.
    async fn sorted_set_range<T: CacheValue>(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        order: SortOrder,
    ) -> TeamStatsResult<Vec<(T, f64)>>;
}
