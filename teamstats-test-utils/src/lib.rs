//! Team Stats Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for teams and leagues
//! - A source-of-record wrapper that counts loads
//! - Fixtures for common scenarios
//! - Assertions on the error taxonomy

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teamstats_core::{Team, TeamId, TeamStatsResult};
use teamstats_storage::TeamSource;

pub use teamstats_storage::{InMemoryStore, InMemoryTeamSource};

// ============================================================================
// COUNTING SOURCE
// ============================================================================

/// Source-of-record wrapper that counts `load_all` calls.
///
/// An optional delay inside `load_all` gives concurrent readers a window to
/// interleave, which is how stampedes are reproduced on a single thread.
#[derive(Debug)]
pub struct CountingSource<R> {
    inner: R,
    loads: AtomicUsize,
    load_delay: Option<Duration>,
}

impl<R: TeamSource> CountingSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            load_delay: None,
        }
    }

    /// Sleep for `delay` inside every `load_all` before answering.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Number of `load_all` calls so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.loads.store(0, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl CountingSource<InMemoryTeamSource> {
    /// Counting in-memory source holding `teams`.
    pub fn with_teams(teams: Vec<Team>) -> Self {
        Self::new(InMemoryTeamSource::with_teams(teams))
    }
}

#[async_trait]
impl<R: TeamSource> TeamSource for CountingSource<R> {
    async fn load_all(&self) -> TeamStatsResult<Vec<Team>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.load_all().await
    }

    async fn get(&self, id: TeamId) -> TeamStatsResult<Option<Team>> {
        self.inner.get(id).await
    }

    async fn revision(&self, id: TeamId) -> TeamStatsResult<Option<u64>> {
        self.inner.revision(id).await
    }

    async fn insert(&self, team: Team) -> TeamStatsResult<u64> {
        self.inner.insert(team).await
    }

    async fn update(&self, team: Team, expected_revision: u64) -> TeamStatsResult<u64> {
        self.inner.update(team, expected_revision).await
    }

    async fn remove(&self, id: TeamId) -> TeamStatsResult<()> {
        self.inner.remove(id).await
    }

    async fn mutate(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.inner.mutate(teams).await
    }

    async fn replace_all(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.inner.replace_all(teams).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for team records.

    use super::*;
    use proptest::prelude::*;
    use teamstats_core::{SEASON_MAX_TIES, SEASON_MAX_WINS};

    pub fn arb_team_id() -> impl Strategy<Value = TeamId> {
        (1i64..10_000).prop_map(TeamId::new)
    }

    /// A team name: letters, digits, spaces and a little punctuation.
    pub fn arb_team_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,.&'-]{0,30}"
    }

    /// A win/loss/tie record in the simulated season's ranges.
    pub fn arb_record() -> impl Strategy<Value = (u32, u32, u32)> {
        (
            0..SEASON_MAX_WINS,
            0..SEASON_MAX_WINS,
            0..SEASON_MAX_TIES,
        )
    }

    pub fn arb_team() -> impl Strategy<Value = Team> {
        (arb_team_id(), arb_team_name(), arb_record()).prop_map(|(id, name, (w, l, t))| {
            Team::new(id, name).with_record(w, l, t)
        })
    }

    /// A league of up to `max` teams with distinct ids.
    pub fn arb_league(max: usize) -> impl Strategy<Value = Vec<Team>> {
        proptest::collection::btree_map(arb_team_id(), (arb_team_name(), arb_record()), 0..=max)
            .prop_map(|rows| {
                rows.into_iter()
                    .map(|(id, (name, (w, l, t)))| Team::new(id, name).with_record(w, l, t))
                    .collect()
            })
    }

    /// A non-empty league with distinct ids.
    pub fn arb_nonempty_league(max: usize) -> impl Strategy<Value = Vec<Team>> {
        arb_league(max.max(1)).prop_filter("league must not be empty", |teams| !teams.is_empty())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built teams and wiring for common test scenarios.

    use super::*;
    use teamstats_storage::{CacheConfig, TeamCache};

    /// A team with the given id and wins, and a fixed loss/tie record.
    pub fn team(id: i64, wins: u32) -> Team {
        Team::new(TeamId::new(id), format!("Team {}", id)).with_record(wins, 3, 1)
    }

    /// Seven teams with distinct wins.
    pub fn league() -> Vec<Team> {
        vec![
            team(1, 11),
            team(2, 25),
            team(3, 3),
            team(4, 19),
            team(5, 32),
            team(6, 7),
            team(7, 14),
        ]
    }

    /// Wins of `league()` in ranked order.
    pub fn league_ranked_wins() -> Vec<u32> {
        vec![32, 25, 19, 14, 11, 7, 3]
    }

    pub type CountingCache = TeamCache<InMemoryStore, CountingSource<InMemoryTeamSource>>;

    /// A cache over an empty in-memory store and a counting source of `teams`.
    pub fn counting_cache(teams: Vec<Team>) -> CountingCache {
        counting_cache_with(CountingSource::with_teams(teams), CacheConfig::default())
    }

    pub fn counting_cache_with(
        source: CountingSource<InMemoryTeamSource>,
        config: CacheConfig,
    ) -> CountingCache {
        TeamCache::new(Arc::new(InMemoryStore::new()), Arc::new(source), config)
    }

    /// Wins of `teams`, in order.
    pub fn wins(teams: &[Team]) -> Vec<u32> {
        teams.iter().map(|t| t.wins).collect()
    }

    /// Ids of `teams`, sorted.
    pub fn sorted_ids(teams: &[Team]) -> Vec<TeamId> {
        let mut ids: Vec<TeamId> = teams.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on results and rankings.

    use super::*;
    use teamstats_core::{SourceError, TeamStatsError};

    /// Assert that a result failed because the store was unavailable.
    #[track_caller]
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &TeamStatsResult<T>) {
        match result {
            Err(e) if e.is_store_unavailable() => {}
            other => panic!("Expected store unavailable, got: {:?}", other),
        }
    }

    /// Assert that a result is a NotFound for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &TeamStatsResult<T>, id: TeamId) {
        match result {
            Err(TeamStatsError::Source(SourceError::NotFound { id: got })) => {
                assert_eq!(*got, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound for {}, got: {:?}", id, other),
        }
    }

    /// Assert that teams are ordered by wins, highest first.
    #[track_caller]
    pub fn assert_ranked(teams: &[Team]) {
        for pair in teams.windows(2) {
            assert!(
                pair[0].wins >= pair[1].wins,
                "{} ({}) ranked above {} ({})",
                pair[0].name,
                pair[0].wins,
                pair[1].name,
                pair[1].wins
            );
        }
    }
}
