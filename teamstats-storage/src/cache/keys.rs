//! Well-known cache keys.
//!
//! All three cache representations of the team set live under one key
//! namespace so that a single glob covers them for invalidation:
//!
//! | representation      | key                      |
//! |---------------------|--------------------------|
//! | ranked set          | `teamsSortedSet`         |
//! | individually keyed  | `team-<id>`              |
//! | invalidation glob   | `team*`                  |

use teamstats_core::TeamId;

/// Default key of the ranked sorted set.
pub const SORTED_SET_KEY: &str = "teamsSortedSet";

/// Default prefix of individually keyed entries.
pub const ENTRY_PREFIX: &str = "team";

/// Key layout for the team cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    sorted_set: String,
    entry_prefix: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(SORTED_SET_KEY, ENTRY_PREFIX)
    }
}

impl CacheKeys {
    /// Build a key layout.
    ///
    /// The invalidation glob is `<entry_prefix>*`, so the sorted-set key must
    /// start with the entry prefix for invalidation to cover it; when it does
    /// not, [`CacheKeys::invalidation_patterns`] returns both keys.
    pub fn new(sorted_set: impl Into<String>, entry_prefix: impl Into<String>) -> Self {
        Self {
            sorted_set: sorted_set.into(),
            entry_prefix: entry_prefix.into(),
        }
    }

    /// Key of the ranked sorted set.
    pub fn sorted_set(&self) -> &str {
        &self.sorted_set
    }

    /// Key of one individually keyed team: `<prefix>-<id>`.
    pub fn entry(&self, id: TeamId) -> String {
        format!("{}-{}", self.entry_prefix, id)
    }

    /// Glob matching every individually keyed team: `<prefix>-*`.
    pub fn entry_pattern(&self) -> String {
        format!("{}-*", self.entry_prefix)
    }

    /// Globs that together cover every team cache key.
    pub fn invalidation_patterns(&self) -> Vec<String> {
        let broad = format!("{}*", self.entry_prefix);
        if self.sorted_set.starts_with(&self.entry_prefix) {
            vec![broad]
        } else {
            vec![broad, self.sorted_set.clone()]
        }
    }
}
