//! One-shot runs of the maintenance jobs.

use std::sync::Arc;

use anyhow::Context;

use super::Output;
use crate::maintenance;
use crate::names::NamePolicy;
use crate::scan;
use crate::DaemonState;

/// Run a single reconciliation pass.
pub async fn reconcile(state: &Arc<DaemonState>) -> Output {
    let client = maintenance::api_client(&state.config.api)?
        .context("api.token and api.network_id must be set to reconcile")?;
    let report = maintenance::reconcile_once(state, &client).await?;
    Ok(vec![
        format!("outcome: {:?}", report.outcome),
        format!(
            "members: {} fetched, {} saved, {} stale",
            report.fetched, report.saved, report.stale
        ),
        format!(
            "blocking: {} candidates, {} tagged, {} missing, {} failed",
            report.candidates, report.tagged, report.missing, report.failed
        ),
    ])
}

/// Purge expired sightings now.
pub async fn cleanup(state: &Arc<DaemonState>) -> Output {
    let stats = maintenance::cleanup_once(state).await?;
    Ok(vec![format!(
        "removed {} member sightings, {} player sightings",
        stats.member_sightings, stats.player_sightings
    )])
}

/// Run the game-list binary once and record its games.
pub async fn scan(state: &Arc<DaemonState>) -> Output {
    let policy = NamePolicy::from_config(&state.config.moderation)?;
    let report = scan::scan(
        &state.db,
        &state.config.gamelist,
        &policy,
        warden_types::now(),
    )
    .await?;

    let mut lines = vec![format!(
        "{} games, {} player sightings, {} member sightings",
        report.active_games, report.player_sightings, report.member_sightings
    )];
    lines.extend(report.hidden.iter().map(|id| format!("hidden: {id}")));
    Ok(lines)
}
