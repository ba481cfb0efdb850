//! In-process store with Redis-compatible semantics.
//!
//! Used by tests and local runs. It mirrors the behaviour the cache layer
//! relies on from Redis:
//! - lazy TTL expiry (expired keys are invisible and reaped on access)
//! - glob key matching for pattern reads and removals
//! - sorted sets ordered by score, ties broken by member bytes
//! - negative rank indexes counting from the end
//!
//! Time is read from `tokio::time`, so tests can pause and advance the clock.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use teamstats_core::{StoreError, TeamStatsResult};
use tokio::time::Instant;

use super::codec::{decode, decode_lenient, encode};
use super::traits::{CacheStore, CacheValue, SortOrder};

#[derive(Debug, Clone)]
enum Stored {
    Bytes(Vec<u8>),
    SortedSet(HashMap<Vec<u8>, f64>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory [`CacheStore`].
///
/// # Example
///
/// ```ignore
/// let store = InMemoryStore::new();
/// store.put("team-1", &team, Some(Duration::from_secs(300))).await?;
/// let cached: Option<Team> = store.get("team-1").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    slots: RwLock<HashMap<String, Slot>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a lost connection: while offline every operation fails with
    /// `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = match self.slots.read() {
            Ok(slots) => slots
                .iter()
                .filter(|(_, slot)| slot.is_live(now))
                .map(|(key, _)| key.clone())
                .collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        self.keys().len()
    }

    /// Remaining time to live of `key`, or `None` when the key is missing or
    /// has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let slots = self.slots.read().ok()?;
        let slot = slots.get(key).filter(|slot| slot.is_live(now))?;
        slot.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Number of members in the sorted set at `key`.
    pub fn sorted_set_len(&self, key: &str) -> usize {
        let now = Instant::now();
        match self.slots.read() {
            Ok(slots) => match slots.get(key).filter(|slot| slot.is_live(now)) {
                Some(Slot {
                    value: Stored::SortedSet(members),
                    ..
                }) => members.len(),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn ensure_online(&self) -> TeamStatsResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store is offline").into());
        }
        Ok(())
    }

    fn read(&self) -> TeamStatsResult<RwLockReadGuard<'_, HashMap<String, Slot>>> {
        self.ensure_online()?;
        self.slots.read().map_err(|_| StoreError::LockPoisoned.into())
    }

    fn write(&self) -> TeamStatsResult<RwLockWriteGuard<'_, HashMap<String, Slot>>> {
        self.ensure_online()?;
        self.slots.write().map_err(|_| StoreError::LockPoisoned.into())
    }

    fn matching_keys(
        slots: &HashMap<String, Slot>,
        pattern: &str,
        now: Instant,
    ) -> TeamStatsResult<Vec<String>> {
        let glob = compile_pattern(pattern)?;
        Ok(slots
            .iter()
            .filter(|(key, slot)| slot.is_live(now) && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> TeamStatsResult<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| {
        StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Serialization {
        key: key.to_string(),
        reason: "WRONGTYPE operation against a key holding the wrong kind of value".to_string(),
    }
}

/// Resolve Redis-style inclusive rank bounds against a set of `len` members.
fn resolve_ranks(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get<T: CacheValue>(&self, key: &str) -> TeamStatsResult<Option<T>> {
        let now = Instant::now();
        let slots = self.read()?;
        match slots.get(key).filter(|slot| slot.is_live(now)) {
            Some(Slot {
                value: Stored::Bytes(bytes),
                ..
            }) => decode(key, bytes),
            Some(_) => Err(wrong_type(key).into()),
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
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.write()?.insert(
            key.to_string(),
            Slot {
                value: Stored::Bytes(bytes),
                expires_at,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> TeamStatsResult<()> {
        self.write()?.remove(key);
        Ok(())
    }

    async fn remove_by_pattern(&self, pattern: &str) -> TeamStatsResult<u64> {
        let now = Instant::now();
        let mut slots = self.write()?;
        let keys = Self::matching_keys(&slots, pattern, now)?;
        for key in &keys {
            slots.remove(key);
        }
        // Reap anything expired while the write lock is held anyway.
        slots.retain(|_, slot| slot.is_live(now));
        Ok(keys.len() as u64)
    }

    async fn get_by_pattern<T: CacheValue>(&self, pattern: &str) -> TeamStatsResult<Vec<T>> {
        let now = Instant::now();
        let slots = self.read()?;
        let mut keys = Self::matching_keys(&slots, pattern, now)?;
        keys.sort();
        Ok(keys
            .iter()
            .filter_map(|key| match slots.get(key).map(|slot| &slot.value) {
                // MGET answers nil for keys that hold other types.
                Some(Stored::Bytes(bytes)) => decode_lenient(key, bytes),
                _ => None,
            })
            .collect())
    }

    async fn sorted_set_add<T: CacheValue>(
        &self,
        key: &str,
        member: &T,
        score: f64,
    ) -> TeamStatsResult<()> {
        let member = encode(key, member)?;
        let now = Instant::now();
        let mut slots = self.write()?;

        if slots.get(key).is_some_and(|slot| !slot.is_live(now)) {
            slots.remove(key);
        }
        let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
            value: Stored::SortedSet(HashMap::new()),
            expires_at: None,
        });
        match &mut slot.value {
            Stored::SortedSet(members) => {
                members.insert(member, score);
                Ok(())
            }
            Stored::Bytes(_) => Err(wrong_type(key).into()),
        }
    }

    async fn sorted_set_range<T: CacheValue>(
        &self,
        key: &str,
        start: isize,
        stop: isize,
        order: SortOrder,
    ) -> TeamStatsResult<Vec<(T, f64)>> {
        let now = Instant::now();
        let slots = self.read()?;
        let members = match slots.get(key).filter(|slot| slot.is_live(now)) {
            Some(Slot {
                value: Stored::SortedSet(members),
                ..
            }) => members,
            Some(_) => return Err(wrong_type(key).into()),
            None => return Ok(Vec::new()),
        };

        let mut ranked: Vec<(&Vec<u8>, f64)> = members.iter().map(|(m, s)| (m, *s)).collect();
        ranked.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        if order == SortOrder::Descending {
            ranked.reverse();
        }

        let Some((first, last)) = resolve_ranks(ranked.len(), start, stop) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(last - first + 1);
        for (member, score) in &ranked[first..=last] {
            if let Some(value) = decode(key, member)? {
                out.push((value, *score));
            }
        }
        Ok(out)
    }
}
