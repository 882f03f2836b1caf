//! Game-list scan: turn advertised games into activity-log sightings.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info};
use warden_db::queries::sightings;
use warden_db::DbError;
use warden_types::gamelist::GameDescriptor;
use warden_types::Timestamp;

use crate::config::GameListConfig;
use crate::gamelist::{self, GameListError, GameListOutcome};
use crate::names::NamePolicy;

/// Scan errors. Game-list failures are transient, store failures are not.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    GameList(#[from] GameListError),

    #[error("store error: {0}")]
    Db(#[from] DbError),
}

/// What one scan recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Games still being advertised.
    pub active_games: usize,
    /// Player/game sightings written.
    pub player_sightings: usize,
    /// Host-address sightings written.
    pub member_sightings: usize,
    /// Active games hidden by the name policy.
    pub hidden: Vec<String>,
}

/// Record sightings for every player in every active game.
///
/// Ended games are skipped. Games hidden by the name policy are still
/// recorded so moderators can look the players up. A game's address is the
/// host's, so players are tied to it as host sightings only.
pub fn record_games(
    conn: &Connection,
    games: &[GameDescriptor],
    policy: &NamePolicy,
    now: Timestamp,
) -> warden_db::Result<ScanReport> {
    let mut report = ScanReport::default();
    let tx = conn.unchecked_transaction()?;

    for game in games.iter().filter(|g| !g.has_ended()) {
        report.active_games += 1;
        let host = game.host_address();

        for player in &game.players {
            sightings::record_player_game_sighting(&tx, player, &game.id, now)?;
            report.player_sightings += 1;
            if let Some(host) = host {
                sightings::record_hosted_sighting(&tx, host, player, now)?;
                report.member_sightings += 1;
            }
        }

        if policy.hides(&game.players) {
            debug!(game = %game.id, "Game hidden by name policy");
            report.hidden.push(game.id.clone());
        }
    }

    tx.commit()?;
    info!(
        games = report.active_games,
        hidden = report.hidden.len(),
        sightings = report.player_sightings,
        "Game list recorded"
    );
    Ok(report)
}

/// Run the discovery binary once and record what it reports.
///
/// The store lock is taken only after the binary has finished.
pub async fn scan(
    db: &Mutex<Connection>,
    config: &GameListConfig,
    policy: &NamePolicy,
    now: Timestamp,
) -> Result<ScanReport, ScanError> {
    let games = match gamelist::fetch_games(Path::new(&config.binary), config.timeout()).await? {
        GameListOutcome::Games(games) => games,
        GameListOutcome::NoGames => return Ok(ScanReport::default()),
    };
    let conn = db.lock().await;
    Ok(record_games(&conn, &games, policy, now)?)
}
