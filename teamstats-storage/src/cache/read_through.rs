//! Cache-aside orchestration over the team set.
//!
//! [`TeamCache`] decides, per [`ReadStrategy`], whether to answer from the
//! store, repopulate the store from the source-of-record, or skip the cache
//! altogether. It also owns invalidation: every mutation it performs on the
//! source is followed by removal of all team cache keys.
//!
//! Population is best effort. Two readers that miss at the same time both
//! load the source and both write back; the writes are idempotent upserts,
//! so the cache converges on one copy of each team.

use std::sync::Arc;
use std::time::Duration;

use teamstats_core::{
    seeded_teams, simulate_season, SourceError, Team, TeamId, TeamStatsResult,
};

use super::keys::CacheKeys;
use super::read::{ReadOutcome, ReadStrategy};
use super::traits::{CacheStore, SortOrder, LAST_RANK};
use crate::source::TeamSource;

/// Expiration of individually keyed entries.
pub const KEYED_TTL: Duration = Duration::from_secs(5 * 60);

/// Size of the ranked top slice.
pub const TOP_N: usize = 5;

pub(crate) const MSG_SORTED_SET_HIT: &str = "Reading sorted set from cache.";
pub(crate) const MSG_SORTED_SET_MISS: &str = "Teams sorted set cache miss.";
pub(crate) const MSG_STORING: &str = "Storing results to cache.";
pub(crate) const MSG_LIST_HIT: &str = "List read from cache.";
pub(crate) const MSG_LIST_MISS: &str = "Teams list cache miss.";
pub(crate) const MSG_FROM_SOURCE: &str = "Results read from DB.";
pub(crate) const MSG_CACHE_DISABLED: &str = "Cache disabled; reading source of record.";

/// Configuration for the team cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Key layout of the three representations.
    pub keys: CacheKeys,
    /// TTL of individually keyed entries.
    pub keyed_ttl: Duration,
    /// Number of teams returned by the ranked top read.
    pub top_n: usize,
    /// When false every strategy reads the source-of-record directly.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keys: CacheKeys::default(),
            keyed_ttl: KEYED_TTL,
            top_n: TOP_N,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key layout.
    pub fn with_keys(mut self, keys: CacheKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Set the TTL of individually keyed entries.
    pub fn with_keyed_ttl(mut self, ttl: Duration) -> Self {
        self.keyed_ttl = ttl;
        self
    }

    /// Set the size of the ranked top slice.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Enable or disable the cache.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Last rank (inclusive) of the top slice, or `None` when the slice is empty.
    fn top_stop_rank(&self) -> Option<isize> {
        self.top_n
            .checked_sub(1)
            .map(|last| isize::try_from(last).unwrap_or(isize::MAX))
    }
}

/// Cache-aside orchestrator for the team set.
///
/// # Type Parameters
///
/// - `S`: the store holding the cache representations
/// - `R`: the source-of-record consulted on a miss
///
/// # Example
///
/// ```ignore
/// let cache = TeamCache::new(Arc::new(store), Arc::new(source), CacheConfig::default());
///
/// let outcome = cache.read(ReadStrategy::RankedTop).await?;
/// for team in outcome.records() {
///     println!("{} {}", team.name, team.wins);
/// }
///
/// cache.simulate_season().await?;
/// ```
pub struct TeamCache<S, R>
where
    S: CacheStore,
    R: TeamSource,
{
    store: Arc<S>,
    source: Arc<R>,
    config: CacheConfig,
}

impl<S, R> TeamCache<S, R>
where
    S: CacheStore,
    R: TeamSource,
{
    pub fn new(store: Arc<S>, source: Arc<R>, config: CacheConfig) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// Create a team cache with default configuration.
    pub fn with_defaults(store: Arc<S>, source: Arc<R>) -> Self {
        Self::new(store, source, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Read the team set with the given strategy.
    #[tracing::instrument(skip_all, fields(strategy = %strategy))]
    pub async fn read(&self, strategy: ReadStrategy) -> TeamStatsResult<ReadOutcome<Team>> {
        if strategy.is_cached() && !self.config.enabled {
            let mut outcome = self.direct().await?;
            outcome.prepend_diagnostics(vec![MSG_CACHE_DISABLED.to_string()]);
            return Ok(outcome);
        }

        match strategy {
            ReadStrategy::Direct => self.direct().await,
            ReadStrategy::RankedSet => self.ranked_set().await,
            ReadStrategy::RankedTop => self.ranked_top().await,
            ReadStrategy::IndividuallyKeyed => self.individually_keyed().await,
        }
    }

    /// Always read the source-of-record.
    pub async fn direct(&self) -> TeamStatsResult<ReadOutcome<Team>> {
        let teams = self.source.load_all().await?;
        Ok(ReadOutcome::from_source(
            teams,
            vec![MSG_FROM_SOURCE.to_string()],
        ))
    }

    /// Read the whole ranked set, populating it on a miss.
    ///
    /// Members come back by score descending, the order the source returns.
    pub async fn ranked_set(&self) -> TeamStatsResult<ReadOutcome<Team>> {
        let cached = self.range(0, LAST_RANK).await?;
        if !cached.is_empty() {
            tracing::debug!(count = cached.len(), "Ranked set cache hit");
            return Ok(ReadOutcome::from_cache(
                cached,
                vec![MSG_SORTED_SET_HIT.to_string()],
            ));
        }

        tracing::debug!("Ranked set cache miss");
        let mut diagnostics = vec![MSG_SORTED_SET_MISS.to_string(), MSG_FROM_SOURCE.to_string()];
        let teams = self.source.load_all().await?;
        diagnostics.push(MSG_STORING.to_string());
        self.populate_ranked_set(&teams).await?;
        Ok(ReadOutcome::from_source(teams, diagnostics))
    }

    /// Read the top of the ranked set, populating the full set on a miss.
    pub async fn ranked_top(&self) -> TeamStatsResult<ReadOutcome<Team>> {
        let retrieving = format!("Retrieving top {} teams from cache.", self.config.top_n);
        let Some(stop) = self.config.top_stop_rank() else {
            return Ok(ReadOutcome::from_cache(Vec::new(), vec![retrieving]));
        };

        let cached = self.range(0, stop).await?;
        if !cached.is_empty() {
            tracing::debug!(count = cached.len(), "Ranked top cache hit");
            return Ok(ReadOutcome::from_cache(cached, vec![retrieving]));
        }

        let populated = self.ranked_set().await?;
        let (_, _, mut diagnostics) = populated.into_parts();
        let top = self.range(0, stop).await?;
        diagnostics.push(retrieving);
        Ok(ReadOutcome::from_source(top, diagnostics))
    }

    /// Read every individually keyed entry, populating them on a miss.
    ///
    /// Cached entries come back in no particular order.
    pub async fn individually_keyed(&self) -> TeamStatsResult<ReadOutcome<Team>> {
        let pattern = self.config.keys.entry_pattern();
        let cached: Vec<Team> = self.store.get_by_pattern(&pattern).await?;
        if !cached.is_empty() {
            tracing::debug!(count = cached.len(), "Keyed entries cache hit");
            return Ok(ReadOutcome::from_cache(
                cached,
                vec![MSG_LIST_HIT.to_string()],
            ));
        }

        tracing::debug!("Keyed entries cache miss");
        let mut diagnostics = vec![MSG_LIST_MISS.to_string(), MSG_FROM_SOURCE.to_string()];
        let teams = self.source.load_all().await?;
        diagnostics.push(MSG_STORING.to_string());
        for team in &teams {
            self.store
                .put(
                    &self.config.keys.entry(team.id),
                    team,
                    Some(self.config.keyed_ttl),
                )
                .await?;
        }
        tracing::info!(count = teams.len(), ttl = ?self.config.keyed_ttl, "Populated keyed entries");
        Ok(ReadOutcome::from_source(teams, diagnostics))
    }

    /// Look up one individually keyed entry without touching the source.
    pub async fn cached_team(&self, id: TeamId) -> TeamStatsResult<Option<Team>> {
        if !self.config.enabled {
            return Ok(None);
        }
        self.store.get(&self.config.keys.entry(id)).await
    }

    /// Remove every team cache key. Safe to call on an empty cache.
    ///
    /// Returns the number of keys removed.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate(&self) -> TeamStatsResult<u64> {
        if !self.config.enabled {
            return Ok(0);
        }
        let mut removed = 0;
        for pattern in self.config.keys.invalidation_patterns() {
            removed += self.store.remove_by_pattern(&pattern).await?;
        }
        tracing::info!(removed, "Team data removed from cache");
        Ok(removed)
    }

    /// Play a season: rewrite every team's statistics, persist, invalidate.
    ///
    /// Returns the teams as persisted.
    pub async fn simulate_season(&self) -> TeamStatsResult<Vec<Team>> {
        let mut teams = self.source.load_all().await?;
        simulate_season(&mut teams);
        self.source.mutate(teams.clone()).await?;
        self.invalidate().await?;
        tracing::info!(count = teams.len(), "Season simulated");
        Ok(teams)
    }

    /// Reseed the source with the sample teams and a fresh season, then invalidate.
    pub async fn rebuild_source(&self) -> TeamStatsResult<Vec<Team>> {
        let teams = seeded_teams();
        self.source.replace_all(teams.clone()).await?;
        self.invalidate().await?;
        tracing::info!(count = teams.len(), "Source of record rebuilt");
        Ok(teams)
    }

    /// One team and its current revision, straight from the source.
    pub async fn details(&self, id: TeamId) -> TeamStatsResult<(Team, u64)> {
        let team = self
            .source
            .get(id)
            .await?
            .ok_or(SourceError::NotFound { id })?;
        let revision = self
            .source
            .revision(id)
            .await?
            .ok_or(SourceError::NotFound { id })?;
        Ok((team, revision))
    }

    /// Insert a team and invalidate. Returns its revision.
    pub async fn create(&self, team: Team) -> TeamStatsResult<u64> {
        let revision = self.source.insert(team).await?;
        self.invalidate().await?;
        Ok(revision)
    }

    /// Update a team based on `expected_revision` and invalidate.
    ///
    /// A collision with a newer revision is reported as-is while the row
    /// still exists, and as not-found once it has been deleted.
    pub async fn update(&self, team: Team, expected_revision: u64) -> TeamStatsResult<u64> {
        let id = team.id;
        match self.source.update(team, expected_revision).await {
            Ok(revision) => {
                self.invalidate().await?;
                Ok(revision)
            }
            Err(e) if e.is_concurrent_modification() => {
                if self.source.get(id).await?.is_none() {
                    return Err(SourceError::NotFound { id }.into());
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a team and invalidate.
    pub async fn delete(&self, id: TeamId) -> TeamStatsResult<()> {
        self.source.remove(id).await?;
        self.invalidate().await?;
        Ok(())
    }

    async fn range(&self, start: isize, stop: isize) -> TeamStatsResult<Vec<Team>> {
        let members: Vec<(Team, f64)> = self
            .store
            .sorted_set_range(
                self.config.keys.sorted_set(),
                start,
                stop,
                SortOrder::Descending,
            )
            .await?;
        Ok(members.into_iter().map(|(team, _)| team).collect())
    }

    async fn populate_ranked_set(&self, teams: &[Team]) -> TeamStatsResult<()> {
        let key = self.config.keys.sorted_set();
        for team in teams {
            tracing::trace!(team = %team.name, wins = team.wins, "Adding to sorted set");
            self.store.sorted_set_add(key, team, team.score()).await?;
        }
        tracing::info!(count = teams.len(), "Populated ranked set");
        Ok(())
    }
}

impl<S, R> Clone for TeamCache<S, R>
where
    S: CacheStore,
    R: TeamSource,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            config: self.config.clone(),
        }
    }
}
