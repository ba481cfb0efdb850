//! Output formatting.

use std::fmt::Write as _;

use teamstats_core::TeamStatsError;

use crate::service::{MutationReceipt, StandingsResponse, TeamDetails};

/// Message shown instead of standings when the cache store cannot be reached.
pub fn degraded_message(err: &TeamStatsError) -> Option<String> {
    err.is_store_unavailable().then(|| {
        format!(
            "Team standings are temporarily unavailable: the cache store could not be reached ({}).",
            err
        )
    })
}

/// Render standings as a ranked table followed by diagnostics.
pub fn standings_table(response: &StandingsResponse) -> String {
    let name_width = response
        .teams
        .iter()
        .map(|t| t.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Team".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<width$}  {:>4}  {:>6}  {:>4}  {:>4}",
        "Rank",
        "Team",
        "Wins",
        "Losses",
        "Ties",
        "GP",
        width = name_width
    );
    for (rank, team) in response.teams.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:>4}  {:>6}  {:>4}  {:>4}",
            rank + 1,
            team.name,
            team.wins,
            team.losses,
            team.ties,
            team.games_played(),
            width = name_width
        );
    }
    if response.teams.is_empty() {
        out.push_str("(no teams)\n");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", response.diagnostics.join(" "));
    out
}

pub fn details_text(details: &TeamDetails) -> String {
    format!(
        "#{} {}\nWins: {}  Losses: {}  Ties: {}\nRevision: {}\n",
        details.team.id,
        details.team.name,
        details.team.wins,
        details.team.losses,
        details.team.ties,
        details.revision
    )
}

pub fn receipt_text(receipt: &MutationReceipt) -> String {
    let mut out = String::new();
    if let Some(id) = receipt.id {
        let _ = write!(out, "Team {}", id);
        if let Some(revision) = receipt.revision {
            let _ = write!(out, " at revision {}", revision);
        }
        out.push_str(". ");
    }
    out.push_str(&receipt.diagnostics.join(" "));
    out.push('\n');
    out
}

pub fn json<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
