//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::error::{CliError, CliResult};

/// Directive used when neither `TEAMSTATS_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "teamstats=info,teamstats_cli=info,teamstats_storage=info,warn";

/// Build the filter from `TEAMSTATS_LOG`, then `RUST_LOG`, then the default.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("TEAMSTATS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for the rendered table or JSON.
pub fn init_tracing(format: LogFormat) -> CliResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| CliError::Telemetry(e.to_string()))?;

    tracing::debug!(format = ?format, "Tracing initialized");
    Ok(())
}
