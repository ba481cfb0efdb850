//! Redis-backed store client.
//!
//! Wraps a multiplexed [`ConnectionManager`] and maps every command onto the
//! [`CacheStore`] contract:
//!
//! | operation          | commands                        |
//! |--------------------|---------------------------------|
//! | `get`              | `GET`                           |
//! | `put`              | `SET` / `SET ... PX`            |
//! | `remove`           | `DEL`                           |
//! | `remove_by_pattern`| `SCAN ... MATCH` loop, one `DEL`|
//! | `get_by_pattern`   | `SCAN ... MATCH` loop, one `MGET`|
//! | `sorted_set_add`   | `ZADD`                          |
//! | `sorted_set_range` | `ZRANGE` / `ZREVRANGE WITHSCORES`|
//!
//! `KEYS` is never used. Every round trip runs under the configured timeout;
//! a timeout or transport error surfaces as a store-unavailable error and is
//! not retried here.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use teamstats_core::{HostDetail, StoreError, StoreSettings, TeamStatsResult};
use tokio::sync::OnceCell;

use super::codec::{decode, decode_lenient, encode};
use super::traits::{CacheStore, CacheValue, SortOrder};

/// Redis implementation of [`CacheStore`].
///
/// # Example
///
/// ```ignore
/// let settings = StoreSettings::from_env()?;
/// let store = RedisStore::connect(&settings).await?;
/// let cache = TeamCache::new(Arc::new(store), Arc::new(source), CacheConfig::default());
/// ```
pub struct RedisStore {
    urls: Vec<String>,
    connection: OnceCell<ConnectionManager>,
    timeout: Duration,
    scan_count: u32,
}

impl RedisStore {
    /// Create a store from settings.
    ///
    /// With `abort_on_connect_fail` the hosts are tried immediately and an
    /// error is returned when none answers. Otherwise the connection is made
    /// on the first round trip.
    pub async fn connect(settings: &StoreSettings) -> TeamStatsResult<Self> {
        settings.validate()?;

        let store = Self {
            urls: settings
                .hosts
                .iter()
                .map(|host| connection_url(settings, host))
                .collect(),
            connection: OnceCell::new(),
            timeout: settings.sync_timeout(),
            scan_count: settings.scan_count,
        };

        if settings.abort_on_connect_fail {
            store.connection().await?;
        }
        Ok(store)
    }

    /// Per round-trip timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connection(&self) -> TeamStatsResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| self.open_first_reachable())
            .await?;
        Ok(manager.clone())
    }

    async fn open_first_reachable(&self) -> TeamStatsResult<ConnectionManager> {
        let mut last_error = String::from("no hosts configured");
        for url in &self.urls {
            let attempt = async {
                let client = redis::Client::open(url.as_str())?;
                ConnectionManager::new(client).await
            };
            match tokio::time::timeout(self.timeout, attempt).await {
                Ok(Ok(manager)) => {
                    tracing::info!(host = %redact(url), "Connected to cache store");
                    return Ok(manager);
                }
                Ok(Err(e)) => {
                    tracing::warn!(host = %redact(url), error = %e, "Cache store host unreachable");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(host = %redact(url), "Cache store connect timed out");
                    last_error = format!("connect timed out after {:?}", self.timeout);
                }
            }
        }
        Err(StoreError::unavailable(last_error).into())
    }

    /// Run one round trip under the configured timeout.
    async fn round_trip<T, F>(&self, operation: &'static str, fut: F) -> TeamStatsResult<T>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_redis_error(operation, e).into()),
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout: self.timeout,
            }
            .into()),
        }
    }

    /// Incrementally enumerate keys matching `pattern` with `SCAN`.
    async fn scan_keys(&self, pattern: &str) -> TeamStatsResult<Vec<String>> {
        let mut conn = self.connection().await?;
        // SCAN may report a key more than once.
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .round_trip(
                    "SCAN",
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(self.scan_count)
                        .query_async(&mut conn),
                )
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys.into_iter().collect())
    }
}

fn connection_url(settings: &StoreSettings, host: &HostDetail) -> String {
    let scheme = if settings.ssl { "rediss" } else { "redis" };
    let auth = match settings.password.as_deref() {
        Some(password) if !password.is_empty() => {
            format!(":{}@", urlencoding::encode(password))
        }
        _ => String::new(),
    };
    format!(
        "{}://{}{}/{}",
        scheme,
        auth,
        host.authority(),
        settings.database
    )
}

fn redact(url: &str) -> String {
    match url.split_once('@') {
        Some((scheme_and_auth, rest)) => {
            let scheme = scheme_and_auth.split("://").next().unwrap_or("redis");
            format!("{}://***@{}", scheme, rest)
        }
        None => url.to_string(),
    }
}

fn map_redis_error(operation: &'static str, e: RedisError) -> StoreError {
    // Server-side rejections (WRONGTYPE, NOAUTH) surface like transport
    // failures: the store could not serve the request.
    StoreError::unavailable(format!("{}: {}", operation, e))
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get<T: CacheValue>(&self, key: &str) -> TeamStatsResult<Option<T>> {
        let mut conn = self.connection().await?;
        let bytes: Option<Vec<u8>> = self.round_trip("GET", conn.get(key)).await?;
        match bytes {
            Some(bytes) => decode(key, &bytes),
            None => Ok(None),
        }
    }

    async fn put<T: CacheValue>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> TeamStatsResult<()> {
        let bytes = encode(key, value)?;
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(bytes);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        self.round_trip("SET", cmd.query_async::<()>(&mut conn))
            .await
    }

    async fn remove(&self, key: &str) -> TeamStatsResult<()> {
        let mut conn = self.connection().await?;
        let _: u64 = self.round_trip("DEL", conn.del(key)).await?;
        Ok(())
    }

    async fn remove_by_pattern(&self, pattern: &str) -> TeamStatsResult<u64> {
        let keys = self.scan_keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = self.round_trip("DEL", conn.del(&keys)).await?;
        tracing::debug!(pattern, matched = keys.len(), removed, "Removed keys by pattern");
        Ok(removed)
    }

    async fn get_by_pattern<T: CacheValue>(&self, pattern: &str) -> TeamStatsResult<Vec<T>> {
        let keys = self.scan_keys(pattern).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection().await?;
        let values: Vec<Option<Vec<u8>>> = self
            .round_trip(
                "MGET",
                redis::cmd("MGET").arg(&keys).query_async(&mut conn),
            )
            .await?;

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(key, bytes)| bytes.and_then(|bytes| decode_lenient(key, &bytes)))
            .collect())
    }

    async fn sorted_set_add<T: CacheValue>(
        &self,
        key: &str,
        member: &T,
        score: f64,
    ) -> TeamStatsResult<()> {
        let member = encode(key, member)?;
        let mut conn = self.connection().await?;
        let _: u64 = self
            .round_trip(
                "ZADD",
                redis::cmd("ZADD")
                    .arg(key)
                    .arg(score)
                    .arg(member)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn sorted_set_range<T: CacheValue>(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        order: SortOrder,
    ) -> TeamStatsResult<Vec<(T, f64)>> {
        let mut conn = self.connection().await?;
        let raw: Vec<(Vec<u8>, f64)> = match order {
            SortOrder::Ascending => {
                self.round_trip("ZRANGE", conn.zrange_withscores(key, start, stop))
                    .await?
            }
            SortOrder::Descending => {
                self.round_trip("ZREVRANGE", conn.zrevrange_withscores(key, start, stop))
                    .await?
            }
        };

        let mut out = Vec::with_capacity(raw.len());
        for (member, score) in raw {
            if let Some(value) = decode(key, &member)? {
                out.push((value, score));
            }
        }
        Ok(out)
    }
}
