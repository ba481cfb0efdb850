//! Team Stats Storage - Store Clients, Source-of-Record and Cache-Aside Layer
//!
//! Defines the store abstraction ([`CacheStore`]) with a Redis client and an
//! in-process implementation, the source-of-record abstraction
//! ([`TeamSource`]) with in-memory and JSON-file implementations, and the
//! [`TeamCache`] orchestrator that ties them together.

pub mod cache;
pub mod json_source;
pub mod source;

pub use cache::{
    CacheConfig, CacheKeys, CacheStore, CacheValue, InMemoryStore, ReadOutcome, ReadSource,
    ReadStrategy, RedisStore, SortOrder, TeamCache, UnknownStrategy, ENTRY_PREFIX, KEYED_TTL,
    LAST_RANK, SORTED_SET_KEY, TOP_N,
};
pub use json_source::JsonFileTeamSource;
pub use source::{InMemoryTeamSource, TeamRow, TeamSource, INITIAL_REVISION};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
