//! # warden-db
//!
//! Persistent store for the warden daemon, a single SQLite database at
//! `$WARDEN_DATA_DIR/warden.db`.
//!
//! ## Tables
//!
//! - `member_sightings`, `player_sightings`: the append-only activity log
//! - `network_members`: snapshot of remote members, keyed by member id
//! - `bans`: banned network addresses
//!
//! Conventions:
//! - WAL mode, foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//! - Every write is a single statement or a single transaction

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the warden database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Convert a timestamp for storage in an INTEGER column.
pub(crate) fn to_sql_time(ts: u64) -> Result<i64> {
    i64::try_from(ts).map_err(|_| DbError::OutOfRange(format!("timestamp {ts}")))
}

/// Canonical form used for case-insensitive name matching.
pub(crate) fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let conn = open_memory().expect("open in-memory db");
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("get user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_wal_mode() {
        let conn = open_memory().expect("open");
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("get journal_mode");
        // In-memory databases use "memory" mode, not WAL
        assert!(mode == "wal" || mode == "memory");
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("warden.db");
        {
            let conn = open(&path).expect("open");
            queries::bans::ban(&conn, "10.0.0.1".parse().expect("ip"), 1).expect("ban");
        }
        let conn = open(&path).expect("reopen");
        assert_eq!(queries::bans::list_bans(&conn).expect("list").len(), 1);
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("TestPlayer"), "testplayer");
        assert_eq!(name_key("ÄRGER"), "ärger");
    }

    #[test]
    fn test_to_sql_time_out_of_range() {
        assert!(matches!(to_sql_time(u64::MAX), Err(DbError::OutOfRange(_))));
        assert_eq!(to_sql_time(42).expect("in range"), 42);
    }
}
