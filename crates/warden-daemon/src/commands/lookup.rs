//! Lookup command handlers.

use std::sync::Arc;

use warden_db::queries::{members, sightings};
use warden_types::format_timestamp;

use super::Output;
use crate::DaemonState;

/// Show one member, or nothing when unknown or stale.
pub async fn member(state: &Arc<DaemonState>, member_id: &str) -> Output {
    let db = state.db.lock().await;
    let line = members::find_member_by_id(&db, member_id)?;
    Ok(if line.is_empty() { Vec::new() } else { vec![line] })
}

/// Show every stored member.
pub async fn members(state: &Arc<DaemonState>) -> Output {
    let db = state.db.lock().await;
    Ok(members::list_members(&db)?
        .iter()
        .map(members::MemberRow::describe)
        .collect())
}

/// Show where a player has been seen.
pub async fn player(state: &Arc<DaemonState>, name: &str) -> Output {
    let db = state.db.lock().await;
    Ok(sightings::find_player_by_name(&db, name)?)
}

/// Show who has been seen in a game, preceded by a summary line.
pub async fn game(state: &Arc<DaemonState>, name: &str) -> Output {
    let db = state.db.lock().await;
    let Some(activity) = sightings::game_activity(&db, name)? else {
        return Ok(Vec::new());
    };
    let mut lines = vec![format!(
        "{name}: {} sightings, first {}, last {}",
        activity.sightings,
        format_timestamp(activity.first_seen),
        format_timestamp(activity.last_seen)
    )];
    lines.extend(sightings::find_game_by_name(&db, name)?);
    Ok(lines)
}
