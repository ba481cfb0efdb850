//! Request handling: one action, then one read.
//!
//! [`TeamStatsService::handle`] is the whole request cycle of the standings
//! page. The action runs first (and invalidates when it mutates), then the
//! selected strategy reads the team set, and the elapsed time of both is
//! appended to the diagnostics.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use teamstats_core::{Team, TeamId, TeamStatsResult};
use teamstats_storage::{CacheStore, ReadSource, ReadStrategy, TeamCache, TeamSource};
use tokio::time::Instant;

pub const MSG_UPDATING: &str = "Updating team statistics.";
pub const MSG_REBUILDING: &str = "Rebuilding source of record.";
pub const MSG_INVALIDATED: &str = "Team data removed from cache.";
pub const MSG_INVALIDATE_SKIPPED: &str = "Cache disabled; nothing to remove.";

/// What to do before reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheAction {
    #[default]
    None,
    /// Rewrite every team's statistics, then invalidate.
    SimulateSeason,
    /// Remove every team cache key.
    InvalidateCache,
    /// Reseed the source-of-record with the sample teams, then invalidate.
    RebuildSource,
}

impl CacheAction {
    pub const ALL: [CacheAction; 4] = [
        CacheAction::None,
        CacheAction::SimulateSeason,
        CacheAction::InvalidateCache,
        CacheAction::RebuildSource,
    ];

    /// Parse a selector value. Unknown values select [`CacheAction::None`].
    pub fn from_selector(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SimulateSeason => "simulate-season",
            Self::InvalidateCache => "invalidate-cache",
            Self::RebuildSource => "rebuild-source",
        }
    }
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for CacheAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(Self::None),
            "simulate-season" | "playGames" => Ok(Self::SimulateSeason),
            "invalidate-cache" | "clearCache" => Ok(Self::InvalidateCache),
            "rebuild-source" | "rebuildDB" => Ok(Self::RebuildSource),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Result of one request cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsResponse {
    pub action: CacheAction,
    pub strategy: ReadStrategy,
    pub source: ReadSource,
    pub teams: Vec<Team>,
    pub diagnostics: Vec<String>,
    pub elapsed_ms: u64,
}

/// One team as stored in the source-of-record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: Team,
    pub revision: u64,
}

/// Result of a single-team mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReceipt {
    pub id: Option<TeamId>,
    pub revision: Option<u64>,
    pub diagnostics: Vec<String>,
}

/// Front door to the team cache for the binary.
pub struct TeamStatsService<S, R>
where
    S: CacheStore,
    R: TeamSource,
{
    cache: TeamCache<S, R>,
}

impl<S, R> TeamStatsService<S, R>
where
    S: CacheStore,
    R: TeamSource,
{
    pub fn new(cache: TeamCache<S, R>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &TeamCache<S, R> {
        &self.cache
    }

    /// Apply `action`, then read with `strategy`.
    #[tracing::instrument(skip_all, fields(action = %action, strategy = %strategy))]
    pub async fn handle(
        &self,
        action: CacheAction,
        strategy: ReadStrategy,
    ) -> TeamStatsResult<StandingsResponse> {
        let started = Instant::now();
        let mut diagnostics = Vec::new();

        match action {
            CacheAction::None => {}
            CacheAction::SimulateSeason => {
                diagnostics.push(MSG_UPDATING.to_string());
                self.cache.simulate_season().await?;
                diagnostics.push(self.invalidated_message().to_string());
            }
            CacheAction::InvalidateCache => {
                self.cache.invalidate().await?;
                diagnostics.push(self.invalidated_message().to_string());
            }
            CacheAction::RebuildSource => {
                diagnostics.push(MSG_REBUILDING.to_string());
                self.cache.rebuild_source().await?;
                diagnostics.push(self.invalidated_message().to_string());
            }
        }

        let mut outcome = self.cache.read(strategy).await?;
        outcome.prepend_diagnostics(diagnostics);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        outcome.push_diagnostic(format!("MS: {}", elapsed_ms));
        tracing::info!(
            elapsed_ms,
            cache_hit = outcome.was_cache_hit(),
            count = outcome.records().len(),
            "Request handled"
        );

        let (teams, source, diagnostics) = outcome.into_parts();
        Ok(StandingsResponse {
            action,
            strategy,
            source,
            teams,
            diagnostics,
            elapsed_ms,
        })
    }

    pub async fn details(&self, id: TeamId) -> TeamStatsResult<TeamDetails> {
        let (team, revision) = self.cache.details(id).await?;
        Ok(TeamDetails { team, revision })
    }

    pub async fn create(&self, team: Team) -> TeamStatsResult<MutationReceipt> {
        let id = team.id;
        let revision = self.cache.create(team).await?;
        Ok(self.receipt(Some(id), Some(revision)))
    }

    pub async fn update(
        &self,
        team: Team,
        expected_revision: u64,
    ) -> TeamStatsResult<MutationReceipt> {
        let id = team.id;
        let revision = self.cache.update(team, expected_revision).await?;
        Ok(self.receipt(Some(id), Some(revision)))
    }

    pub async fn delete(&self, id: TeamId) -> TeamStatsResult<MutationReceipt> {
        self.cache.delete(id).await?;
        Ok(self.receipt(Some(id), None))
    }

    pub async fn invalidate(&self) -> TeamStatsResult<MutationReceipt> {
        let removed = self.cache.invalidate().await?;
        let mut receipt = self.receipt(None, None);
        receipt.diagnostics.push(format!("Removed {} keys.", removed));
        Ok(receipt)
    }

    fn receipt(&self, id: Option<TeamId>, revision: Option<u64>) -> MutationReceipt {
        MutationReceipt {
            id,
            revision,
            diagnostics: vec![self.invalidated_message().to_string()],
        }
    }

    fn invalidated_message(&self) -> &'static str {
        if self.cache.config().enabled {
            MSG_INVALIDATED
        } else {
            MSG_INVALIDATE_SKIPPED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_selector_aliases() {
        assert_eq!(CacheAction::from_selector("playGames"), CacheAction::SimulateSeason);
        assert_eq!(CacheAction::from_selector("clearCache"), CacheAction::InvalidateCache);
        assert_eq!(CacheAction::from_selector("rebuildDB"), CacheAction::RebuildSource);
        assert_eq!(CacheAction::from_selector(""), CacheAction::None);
        assert_eq!(CacheAction::from_selector("dropTables"), CacheAction::None);
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in CacheAction::ALL {
            assert_eq!(action.as_str().parse::<CacheAction>(), Ok(action));
        }
    }

    #[test]
    fn test_action_serializes_kebab_case() {
        let json = serde_json::to_string(&CacheAction::SimulateSeason).unwrap();
        assert_eq!(json, "\"simulate-season\"");
    }
}
