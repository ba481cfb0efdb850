//! Team record and season simulation

use crate::TeamId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exclusive upper bound for simulated wins and losses.
pub const SEASON_MAX_WINS: u32 = 33;

/// Exclusive upper bound for simulated ties.
pub const SEASON_MAX_TIES: u32 = 5;

/// Names of the sample teams used when the source-of-record is rebuilt.
/// Ids are assigned 1-based in this order.
pub const SAMPLE_TEAM_NAMES: [&str; 12] = [
    "Adventure Works Cycles",
    "Alpine Ski House",
    "Blue Yonder Airlines",
    "Coho Vineyard",
    "Contoso, Ltd.",
    "Fabrikam, Inc.",
    "Lucerne Publishing",
    "Northwind Traders",
    "Consolidated Messenger",
    "Fourth Coffee",
    "Graphic Design Institute",
    "Nod Publishers",
];

/// A team and its season statistics.
///
/// This is the unit stored in every cache representation. The cache layer
/// never creates teams itself; it only copies what the source-of-record
/// returns. `wins` doubles as the rank score in the sorted set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Team {
    /// Create a team with an empty record.
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            wins: 0,
            losses: 0,
            ties: 0,
        }
    }

    /// Set the win/loss/tie record.
    pub fn with_record(mut self, wins: u32, losses: u32, ties: u32) -> Self {
        self.wins = wins;
        self.losses = losses;
        self.ties = ties;
        self
    }

    /// Rank score used by the sorted-set representation.
    pub fn score(&self) -> f64 {
        f64::from(self.wins)
    }

    /// Total number of games played, saturating at `u32::MAX`.
    pub fn games_played(&self) -> u32 {
        self.wins
            .saturating_add(self.losses)
            .saturating_add(self.ties)
    }
}

/// Play a "season" of games: overwrite every team's statistics with fresh
/// pseudo-random values.
///
/// Wins and losses are drawn uniformly from `[0, 33)`, ties from `[0, 5)`.
pub fn simulate_season(teams: &mut [Team]) {
    let mut rng = rand::rng();
    simulate_season_with(teams, &mut rng);
}

/// [`simulate_season`] with a caller-supplied random source.
pub fn simulate_season_with<R: Rng + ?Sized>(teams: &mut [Team], rng: &mut R) {
    for team in teams.iter_mut() {
        team.wins = rng.random_range(0..SEASON_MAX_WINS);
        team.losses = rng.random_range(0..SEASON_MAX_WINS);
        team.ties = rng.random_range(0..SEASON_MAX_TIES);
    }
}

/// The twelve sample teams with empty records.
pub fn sample_teams() -> Vec<Team> {
    SAMPLE_TEAM_NAMES
        .iter()
        .zip(1i64..)
        .map(|(name, id)| Team::new(TeamId::new(id), *name))
        .collect()
}

/// Sample teams with a simulated season already played.
///
/// This is what the source-of-record is reseeded with on a rebuild.
pub fn seeded_teams() -> Vec<Team> {
    let mut teams = sample_teams();
    simulate_season(&mut teams);
    teams
}

/// Sort teams the way the source-of-record returns them: wins descending.
///
/// The sort is stable, so teams with equal wins keep their relative order.
pub fn sort_by_wins_desc(teams: &mut [Team]) {
    teams.sort_by(|a, b| b.wins.cmp(&a.wins));
}
