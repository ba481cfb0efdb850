//! teamstats entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use teamstats_cli::render;
use teamstats_cli::{AppConfig, CacheAction, CliError, CliResult, TeamStatsService};
use teamstats_core::{Team, TeamId};
use teamstats_storage::{CacheConfig, JsonFileTeamSource, ReadStrategy, RedisStore, TeamCache};

/// Team standings served through a cache-aside Redis layer.
#[derive(Parser, Debug)]
#[command(name = "teamstats", version)]
struct Cli {
    /// TOML config file (falls back to TEAMSTATS_CONFIG, then the environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply an action, then read the standings.
    Show {
        /// none, simulate-season, invalidate-cache or rebuild-source.
        #[arg(long, default_value = "none")]
        action: String,
        /// direct, ranked-set, ranked-set-top-5 or individually-keyed.
        #[arg(long, default_value = "direct")]
        strategy: String,
    },

    /// Show one team from the source of record.
    Details { id: TeamId },

    /// Add a team.
    Create {
        #[arg(long)]
        id: TeamId,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        wins: u32,
        #[arg(long, default_value_t = 0)]
        losses: u32,
        #[arg(long, default_value_t = 0)]
        ties: u32,
    },

    /// Change a team read at `--revision`.
    Update {
        #[arg(long)]
        id: TeamId,
        #[arg(long)]
        revision: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        wins: Option<u32>,
        #[arg(long)]
        losses: Option<u32>,
        #[arg(long)]
        ties: Option<u32>,
    },

    /// Remove a team.
    Delete { id: TeamId },

    /// Remove every team cache key.
    Invalidate,
}

impl Default for Command {
    fn default() -> Self {
        Self::Show {
            action: CacheAction::None.to_string(),
            strategy: ReadStrategy::Direct.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match &err {
                CliError::TeamStats(inner) => match render::degraded_message(inner) {
                    Some(message) => println!("{}", message),
                    None => eprintln!("Error: {}", err),
                },
                _ => eprintln!("Error: {}", err),
            }
            tracing::error!(error = %err, "Command failed");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    teamstats_cli::telemetry::init_tracing(config.log_format)?;

    let store = RedisStore::connect(&config.store).await?;
    let source = JsonFileTeamSource::new(&config.source_path);
    let cache = TeamCache::new(
        Arc::new(store),
        Arc::new(source),
        CacheConfig::new().with_enabled(config.store.enabled),
    );
    let service = TeamStatsService::new(cache);

    let output = match cli.cmd.unwrap_or_default() {
        Command::Show { action, strategy } => {
            let response = service
                .handle(
                    CacheAction::from_selector(&action),
                    ReadStrategy::from_selector(&strategy),
                )
                .await?;
            if cli.json {
                render::json(&response)?
            } else {
                render::standings_table(&response)
            }
        }
        Command::Details { id } => {
            let details = service.details(id).await?;
            if cli.json {
                render::json(&details)?
            } else {
                render::details_text(&details)
            }
        }
        Command::Create {
            id,
            name,
            wins,
            losses,
            ties,
        } => {
            let team = Team::new(id, name).with_record(wins, losses, ties);
            let receipt = service.create(team).await?;
            receipt_output(&receipt, cli.json)?
        }
        Command::Update {
            id,
            revision,
            name,
            wins,
            losses,
            ties,
        } => {
            let mut team = service.details(id).await?.team;
            if let Some(name) = name {
                team.name = name;
            }
            team.wins = wins.unwrap_or(team.wins);
            team.losses = losses.unwrap_or(team.losses);
            team.ties = ties.unwrap_or(team.ties);
            let receipt = service.update(team, revision).await?;
            receipt_output(&receipt, cli.json)?
        }
        Command::Delete { id } => {
            let receipt = service.delete(id).await?;
            receipt_output(&receipt, cli.json)?
        }
        Command::Invalidate => {
            let receipt = service.invalidate().await?;
            receipt_output(&receipt, cli.json)?
        }
    };

    print!("{}", output);
    if cli.json {
        println!();
    }
    Ok(())
}

fn receipt_output(
    receipt: &teamstats_cli::service::MutationReceipt,
    json: bool,
) -> CliResult<String> {
    if json {
        Ok(render::json(receipt)?)
    } else {
        Ok(render::receipt_text(receipt))
    }
}
