//! Source-of-record adapter.
//!
//! The cache layer only ever reads the source through [`TeamSource::load_all`]
//! on a miss; everything else here is the mutation surface that callers must
//! follow with an invalidation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teamstats_core::{sort_by_wins_desc, SourceError, Team, TeamId, TeamStatsResult};

/// Revision assigned to a freshly inserted row.
pub const INITIAL_REVISION: u64 = 1;

/// Async source-of-record for team rows.
///
/// Every row carries a revision that increases on each write. Updates name
/// the revision they were based on, so two writers racing on the same row
/// cannot silently overwrite each other.
#[async_trait]
pub trait TeamSource: Send + Sync {
    /// Every team, ordered by wins descending.
    async fn load_all(&self) -> TeamStatsResult<Vec<Team>>;

    /// Look up one team.
    async fn get(&self, id: TeamId) -> TeamStatsResult<Option<Team>>;

    /// Current revision of one row.
    async fn revision(&self, id: TeamId) -> TeamStatsResult<Option<u64>>;

    /// Insert a new team. Fails with `DuplicateId` when the id is taken.
    async fn insert(&self, team: Team) -> TeamStatsResult<u64>;

    /// Replace a team if its row is still at `expected_revision`.
    ///
    /// Returns the new revision. A revision mismatch is reported as
    /// `ConcurrentModification`, a missing row as `NotFound`.
    async fn update(&self, team: Team, expected_revision: u64) -> TeamStatsResult<u64>;

    /// Delete a team. Fails with `NotFound` when the row is missing.
    async fn remove(&self, id: TeamId) -> TeamStatsResult<()>;

    /// Overwrite the given teams unconditionally, bumping their revisions.
    /// Rows not named in `teams` are left alone.
    async fn mutate(&self, teams: Vec<Team>) -> TeamStatsResult<()>;

    /// Drop every row and store `teams` in their place.
    async fn replace_all(&self, teams: Vec<Team>) -> TeamStatsResult<()>;
}

/// One persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRow {
    #[serde(flatten)]
    pub team: Team,
    pub revision: u64,
}

/// Row table shared by the source implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TeamTable {
    rows: BTreeMap<TeamId, TeamRow>,
}

impl TeamTable {
    pub(crate) fn from_rows(rows: Vec<TeamRow>) -> Result<Self, SourceError> {
        let mut table = Self::default();
        for row in rows {
            let id = row.team.id;
            if table.rows.insert(id, row).is_some() {
                return Err(SourceError::Corrupt {
                    reason: format!("duplicate team id {}", id),
                });
            }
        }
        Ok(table)
    }

    pub(crate) fn rows(&self) -> Vec<TeamRow> {
        self.rows.values().cloned().collect()
    }

    pub(crate) fn load_all(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.rows.values().map(|row| row.team.clone()).collect();
        sort_by_wins_desc(&mut teams);
        teams
    }

    pub(crate) fn get(&self, id: TeamId) -> Option<Team> {
        self.rows.get(&id).map(|row| row.team.clone())
    }

    pub(crate) fn revision(&self, id: TeamId) -> Option<u64> {
        self.rows.get(&id).map(|row| row.revision)
    }

    pub(crate) fn insert(&mut self, team: Team) -> Result<u64, SourceError> {
        let id = team.id;
        if self.rows.contains_key(&id) {
            return Err(SourceError::DuplicateId { id });
        }
        self.rows.insert(
            id,
            TeamRow {
                team,
                revision: INITIAL_REVISION,
            },
        );
        Ok(INITIAL_REVISION)
    }

    pub(crate) fn update(&mut self, team: Team, expected_revision: u64) -> Result<u64, SourceError> {
        let id = team.id;
        let row = self.rows.get_mut(&id).ok_or(SourceError::NotFound { id })?;
        if row.revision != expected_revision {
            return Err(SourceError::ConcurrentModification {
                id,
                expected: expected_revision,
                actual: row.revision,
            });
        }
        row.team = team;
        row.revision += 1;
        Ok(row.revision)
    }

    pub(crate) fn remove(&mut self, id: TeamId) -> Result<(), SourceError> {
        self.rows
            .remove(&id)
            .map(|_| ())
            .ok_or(SourceError::NotFound { id })
    }

    pub(crate) fn mutate(&mut self, teams: Vec<Team>) {
        for team in teams {
            match self.rows.get_mut(&team.id) {
                Some(row) => {
                    row.team = team;
                    row.revision += 1;
                }
                None => {
                    self.rows.insert(
                        team.id,
                        TeamRow {
                            team,
                            revision: INITIAL_REVISION,
                        },
                    );
                }
            }
        }
    }

    pub(crate) fn replace_all(&mut self, teams: Vec<Team>) -> Result<(), SourceError> {
        let rows = teams
            .into_iter()
            .map(|team| TeamRow {
                team,
                revision: INITIAL_REVISION,
            })
            .collect();
        *self = Self::from_rows(rows)?;
        Ok(())
    }
}

/// In-memory source-of-record.
///
/// # Example
///
/// ```ignore
/// let source = InMemoryTeamSource::with_teams(seeded_teams());
/// let ranked = source.load_all().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTeamSource {
    table: RwLock<TeamTable>,
}

impl InMemoryTeamSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding `teams`, each at the initial revision.
    ///
    /// Later duplicates of an id replace earlier ones.
    pub fn with_teams(teams: Vec<Team>) -> Self {
        let mut table = TeamTable::default();
        table.mutate(teams);
        for row in table.rows.values_mut() {
            row.revision = INITIAL_REVISION;
        }
        Self {
            table: RwLock::new(table),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&TeamTable) -> T) -> TeamStatsResult<T> {
        let table = self.table.read().map_err(|_| SourceError::LockPoisoned)?;
        Ok(f(&table))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut TeamTable) -> Result<T, SourceError>,
    ) -> TeamStatsResult<T> {
        let mut table = self.table.write().map_err(|_| SourceError::LockPoisoned)?;
        Ok(f(&mut table)?)
    }
}

#[async_trait]
impl TeamSource for InMemoryTeamSource {
    async fn load_all(&self) -> TeamStatsResult<Vec<Team>> {
        self.read(TeamTable::load_all)
    }

    async fn get(&self, id: TeamId) -> TeamStatsResult<Option<Team>> {
        self.read(|table| table.get(id))
    }

    async fn revision(&self, id: TeamId) -> TeamStatsResult<Option<u64>> {
        self.read(|table| table.revision(id))
    }

    async fn insert(&self, team: Team) -> TeamStatsResult<u64> {
        self.write(|table| table.insert(team))
    }

    async fn update(&self, team: Team, expected_revision: u64) -> TeamStatsResult<u64> {
        self.write(|table| table.update(team, expected_revision))
    }

    async fn remove(&self, id: TeamId) -> TeamStatsResult<()> {
        self.write(|table| table.remove(id))
    }

    async fn mutate(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.write(|table| {
            table.mutate(teams);
            Ok(())
        })
    }

    async fn replace_all(&self, teams: Vec<Team>) -> TeamStatsResult<()> {
        self.write(|table| table.replace_all(teams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamstats_core::TeamStatsError;

    fn team(id: i64, wins: u32) -> Team {
        Team::new(TeamId::new(id), format!("Team {}", id)).with_record(wins, 0, 0)
    }

    #[tokio::test]
    async fn test_load_all_orders_by_wins_desc() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3), team(2, 9), team(3, 5)]);
        let wins: Vec<u32> = source.load_all().await.unwrap().iter().map(|t| t.wins).collect();
        assert_eq!(wins, vec![9, 5, 3]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3)]);
        let err = source.insert(team(1, 4)).await.unwrap_err();
        assert_eq!(
            err,
            TeamStatsError::Source(SourceError::DuplicateId { id: TeamId::new(1) })
        );
    }

    #[tokio::test]
    async fn test_update_bumps_revision() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3)]);
        let next = source.update(team(1, 10), INITIAL_REVISION).await.unwrap();

        assert_eq!(next, INITIAL_REVISION + 1);
        assert_eq!(source.revision(TeamId::new(1)).await.unwrap(), Some(next));
        assert_eq!(source.get(TeamId::new(1)).await.unwrap().unwrap().wins, 10);
    }

    #[tokio::test]
    async fn test_stale_update_is_concurrent_modification() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3)]);
        source.update(team(1, 4), INITIAL_REVISION).await.unwrap();

        let err = source.update(team(1, 5), INITIAL_REVISION).await.unwrap_err();
        assert!(err.is_concurrent_modification());
        assert_eq!(source.get(TeamId::new(1)).await.unwrap().unwrap().wins, 4);
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_row_is_not_found() {
        let source = InMemoryTeamSource::new();
        assert!(source.update(team(7, 1), 1).await.unwrap_err().is_not_found());
        assert!(source.remove(TeamId::new(7)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mutate_upserts_and_keeps_other_rows() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3), team(2, 4)]);
        source.mutate(vec![team(1, 20), team(3, 1)]).await.unwrap();

        assert_eq!(source.load_all().await.unwrap().len(), 3);
        assert_eq!(source.revision(TeamId::new(1)).await.unwrap(), Some(2));
        assert_eq!(source.revision(TeamId::new(2)).await.unwrap(), Some(1));
        assert_eq!(source.revision(TeamId::new(3)).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_replace_all_resets_table() {
        let source = InMemoryTeamSource::with_teams(vec![team(1, 3), team(2, 4)]);
        source.update(team(1, 8), 1).await.unwrap();
        source.replace_all(vec![team(5, 2)]).await.unwrap();

        let all = source.load_all().await.unwrap();
        assert_eq!(all, vec![team(5, 2)]);
        assert_eq!(source.revision(TeamId::new(5)).await.unwrap(), Some(INITIAL_REVISION));
    }

    #[test]
    fn test_table_rejects_duplicate_rows() {
        let row = TeamRow {
            team: team(1, 1),
            revision: 1,
        };
        let err = TeamTable::from_rows(vec![row.clone(), row]).unwrap_err();
        assert!(matches!(err, SourceError::Corrupt { .. }));
    }
}
