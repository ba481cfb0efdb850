//! Team Stats CLI library exports.

pub mod config;
pub mod error;
pub mod render;
pub mod service;
pub mod telemetry;

pub use config::{AppConfig, LogFormat};
pub use error::{CliError, CliResult};
pub use service::{CacheAction, StandingsResponse, TeamStatsService};
