//! Activity log: player and player/game sightings.
//!
//! Both tables are append-only. Repeated sightings of the same pair insert
//! new rows; only [`clean_up`] ever deletes.

use std::net::IpAddr;

use rusqlite::Connection;
use warden_types::format_timestamp;

use crate::{name_key, to_sql_time, Result};

/// Record that `player_name` was seen at `address`.
pub fn record_member_sighting(
    conn: &Connection,
    address: IpAddr,
    player_name: &str,
    at: u64,
) -> Result<()> {
    insert_member_sighting(conn, address, player_name, at, false)
}

/// Record that `player_name` was seen in a game hosted at `host_address`.
///
/// The address identifies the host, not necessarily the player.
pub fn record_hosted_sighting(
    conn: &Connection,
    host_address: IpAddr,
    player_name: &str,
    at: u64,
) -> Result<()> {
    insert_member_sighting(conn, host_address, player_name, at, true)
}

fn insert_member_sighting(
    conn: &Connection,
    address: IpAddr,
    player_name: &str,
    at: u64,
    via_host: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO member_sightings (address, player_name, name_key, observed_at, via_host)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            address.to_string(),
            player_name,
            name_key(player_name),
            to_sql_time(at)?,
            via_host,
        ],
    )?;
    Ok(())
}

/// Record that `player_name` was seen in `game_name`.
pub fn record_player_game_sighting(
    conn: &Connection,
    player_name: &str,
    game_name: &str,
    at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO player_sightings (player_name, game_name, game_key, observed_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![player_name, game_name, name_key(game_name), to_sql_time(at)?],
    )?;
    Ok(())
}

/// Member sightings for a player name, oldest first.
pub fn member_sightings(conn: &Connection, player_name: &str) -> Result<Vec<MemberSightingRow>> {
    let mut stmt = conn.prepare(
        "SELECT address, player_name, observed_at, via_host FROM member_sightings
         WHERE name_key = ?1 ORDER BY observed_at, id",
    )?;

    let rows = stmt
        .query_map([name_key(player_name)], |row| {
            Ok(MemberSightingRow {
                address: row.get(0)?,
                player_name: row.get(1)?,
                observed_at: row.get::<_, i64>(2)? as u64,
                via_host: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Player/game sightings for a game name, oldest first.
pub fn game_sightings(conn: &Connection, game_name: &str) -> Result<Vec<PlayerSightingRow>> {
    let mut stmt = conn.prepare(
        "SELECT player_name, game_name, observed_at FROM player_sightings
         WHERE game_key = ?1 ORDER BY observed_at, id",
    )?;

    let rows = stmt
        .query_map([name_key(game_name)], |row| {
            Ok(PlayerSightingRow {
                player_name: row.get(0)?,
                game_name: row.get(1)?,
                observed_at: row.get::<_, i64>(2)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// One line per sighting of `name`. Case-insensitive.
pub fn find_player_by_name(conn: &Connection, name: &str) -> Result<Vec<String>> {
    Ok(member_sightings(conn, name)?
        .iter()
        .map(MemberSightingRow::describe)
        .collect())
}

/// One line per player sighting in game `name`. Case-insensitive.
pub fn find_game_by_name(conn: &Connection, name: &str) -> Result<Vec<String>> {
    Ok(game_sightings(conn, name)?
        .iter()
        .map(PlayerSightingRow::describe)
        .collect())
}

/// First and last time a game was seen, aggregated over the log.
pub fn game_activity(conn: &Connection, game_name: &str) -> Result<Option<GameActivity>> {
    let (first, last, count) = conn.query_row(
        "SELECT MIN(observed_at), MAX(observed_at), COUNT(*) FROM player_sightings
         WHERE game_key = ?1",
        [name_key(game_name)],
        |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
    )?;

    Ok(match (first, last) {
        (Some(first), Some(last)) if count > 0 => Some(GameActivity {
            first_seen: first as u64,
            last_seen: last as u64,
            sightings: count as u64,
        }),
        _ => None,
    })
}

/// Delete sightings strictly older than `now - retention_secs`.
///
/// Both tables are purged in one transaction. Safe to repeat.
pub fn clean_up(conn: &Connection, now: u64, retention_secs: u64) -> Result<CleanupStats> {
    let cutoff = to_sql_time(now.saturating_sub(retention_secs))?;
    let tx = conn.unchecked_transaction()?;
    let member_sightings = tx.execute(
        "DELETE FROM member_sightings WHERE observed_at < ?1",
        [cutoff],
    )?;
    let player_sightings = tx.execute(
        "DELETE FROM player_sightings WHERE observed_at < ?1",
        [cutoff],
    )?;
    tx.commit()?;

    let stats = CleanupStats {
        member_sightings,
        player_sightings,
    };
    tracing::debug!(?stats, cutoff, "Purged expired sightings");
    Ok(stats)
}

/// A raw member sighting row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSightingRow {
    pub address: String,
    pub player_name: String,
    pub observed_at: u64,
    /// `address` belongs to the host of the game the player was in.
    pub via_host: bool,
}

/// A raw player/game sighting row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSightingRow {
    pub player_name: String,
    pub game_name: String,
    pub observed_at: u64,
}

/// Aggregated first/last sighting of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameActivity {
    pub first_seen: u64,
    pub last_seen: u64,
    pub sightings: u64,
}

/// Rows removed by one [`clean_up`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub member_sightings: usize,
    pub player_sightings: usize,
}

impl MemberSightingRow {
    pub fn describe(&self) -> String {
        let label = if self.via_host { "host " } else { "" };
        format!(
            "{} [{label}{}] seen {}",
            self.player_name,
            self.address,
            format_timestamp(self.observed_at)
        )
    }
}

impl PlayerSightingRow {
    pub fn describe(&self) -> String {
        format!(
            "{} in {} at {}",
            self.player_name,
            self.game_name,
            format_timestamp(self.observed_at)
        )
    }
}

impl CleanupStats {
    /// Total rows removed.
    pub fn total(&self) -> usize {
        self.member_sightings + self.player_sightings
    }
}
