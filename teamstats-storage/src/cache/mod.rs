//! Cache layer: store clients and the cache-aside orchestrator.
//!
//! One logical dataset, the team set, is cached in three shapes:
//!
//! - a ranked sorted set under one key, scored by wins
//! - a top slice read from that same sorted set
//! - one entry per team under `team-<id>`, each with its own TTL
//!
//! The shapes are populated independently and go stale independently.
//! [`TeamCache::invalidate`] removes all of them with one glob.
//!
//! # Example
//!
//! ```ignore
//! let cache = TeamCache::new(store, source, CacheConfig::default());
//!
//! let top = cache.read(ReadStrategy::RankedTop).await?;
//! if !top.was_cache_hit() {
//!     tracing::info!("cache was cold");
//! }
//!
//! cache.simulate_season().await?; // invalidates
//! ```

mod codec;
pub mod keys;
pub mod memory;
pub mod read;
pub mod read_through;
pub mod redis_backend;
pub mod traits;

pub use keys::{CacheKeys, ENTRY_PREFIX, SORTED_SET_KEY};
pub use memory::InMemoryStore;
pub use read::{ReadOutcome, ReadSource, ReadStrategy, UnknownStrategy};
pub use read_through::{CacheConfig, TeamCache, KEYED_TTL, TOP_N};
pub use redis_backend::RedisStore;
pub use traits::{CacheStore, CacheValue, SortOrder, LAST_RANK};
