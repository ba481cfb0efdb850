//! Team Stats Core - Entity Types
//!
//! Data types shared by every other crate: the [`Team`] record, its
//! identifier, the season simulation that rewrites team statistics, store
//! settings, and the error taxonomy.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::{HostDetail, StoreSettings, DEFAULT_PORT};
pub use entities::{
    sample_teams, seeded_teams, simulate_season, simulate_season_with, sort_by_wins_desc, Team,
    SAMPLE_TEAM_NAMES, SEASON_MAX_TIES, SEASON_MAX_WINS,
};
pub use error::{ConfigError, SourceError, StoreError, TeamStatsError, TeamStatsResult};
pub use identity::TeamId;
