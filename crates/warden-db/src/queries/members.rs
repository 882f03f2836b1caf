//! Network member snapshot.
//!
//! Rows are upserted by member id from the reconciliation pass. Writes
//! carrying an observation older than [`FRESHNESS_HORIZON_SECS`] are dropped;
//! reads do not re-check freshness.

use std::net::IpAddr;

use rusqlite::{Connection, OptionalExtension};
use warden_types::{format_timestamp, FRESHNESS_HORIZON_SECS};

use crate::{to_sql_time, Result};

/// Outcome of [`save_member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Row inserted or overwritten.
    Saved,
    /// Observation older than the freshness horizon; nothing written.
    Stale,
}

/// Whether an observation made at `last_seen` is still fresh at `now`.
pub fn is_fresh(last_seen: u64, now: u64) -> bool {
    now.saturating_sub(last_seen) <= FRESHNESS_HORIZON_SECS
}

/// Insert or overwrite a member, unless the observation is stale.
pub fn save_member(
    conn: &Connection,
    member_id: &str,
    address: Option<IpAddr>,
    last_seen: u64,
    status: &str,
    now: u64,
) -> Result<SaveOutcome> {
    if !is_fresh(last_seen, now) {
        tracing::debug!(member_id, last_seen, "Skipping stale member observation");
        return Ok(SaveOutcome::Stale);
    }

    let address = address.map(|a| a.to_string()).unwrap_or_default();
    conn.execute(
        "INSERT INTO network_members (member_id, address, last_seen, status)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(member_id) DO UPDATE SET
             address = excluded.address,
             last_seen = excluded.last_seen,
             status = excluded.status",
        rusqlite::params![member_id, address, to_sql_time(last_seen)?, status],
    )?;
    Ok(SaveOutcome::Saved)
}

/// Get a member row by id.
pub fn get(conn: &Connection, member_id: &str) -> Result<Option<MemberRow>> {
    let row = conn
        .query_row(
            "SELECT member_id, address, last_seen, status
             FROM network_members WHERE member_id = ?1",
            [member_id],
            |row| {
                Ok(MemberRow {
                    member_id: row.get(0)?,
                    address: row.get(1)?,
                    last_seen: row.get::<_, i64>(2)? as u64,
                    status: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Summary line for a member, or an empty string when unknown.
pub fn find_member_by_id(conn: &Connection, member_id: &str) -> Result<String> {
    Ok(get(conn, member_id)?
        .map(|row| row.describe())
        .unwrap_or_default())
}

/// List all stored members, ordered by id.
pub fn list_members(conn: &Connection) -> Result<Vec<MemberRow>> {
    let mut stmt = conn.prepare(
        "SELECT member_id, address, last_seen, status
         FROM network_members ORDER BY member_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(MemberRow {
                member_id: row.get(0)?,
                address: row.get(1)?,
                last_seen: row.get::<_, i64>(2)? as u64,
                status: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// A raw member row. `address` is empty when unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub member_id: String,
    pub address: String,
    pub last_seen: u64,
    pub status: String,
}

impl MemberRow {
    pub fn describe(&self) -> String {
        let seen = format_timestamp(self.last_seen);
        if self.address.is_empty() {
            format!("{} {} (last seen {seen})", self.member_id, self.status)
        } else {
            format!(
                "{} {} {} (last seen {seen})",
                self.member_id, self.address, self.status
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::SECS_PER_DAY;

    const NOW: u64 = 1_700_000_000;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn ip(s: &str) -> Option<IpAddr> {
        Some(s.parse().expect("ip"))
    }

    #[test]
    fn test_save_and_find_member() {
        let conn = test_db();
        let outcome = save_member(&conn, "abc123", ip("192.168.1.1"), NOW, "allowed", NOW)
            .expect("save");
        assert_eq!(outcome, SaveOutcome::Saved);

        let line = find_member_by_id(&conn, "abc123").expect("find");
        assert!(line.contains("abc123"));
        assert!(line.contains("192.168.1.1"));
        assert!(line.contains("allowed"));
    }

    #[test]
    fn test_find_member_not_found() {
        let conn = test_db();
        assert_eq!(find_member_by_id(&conn, "nonexistent").expect("find"), "");
    }

    #[test]
    fn test_member_without_address() {
        let conn = test_db();
        save_member(&conn, "abc123", None, NOW, "allowed", NOW).expect("save");

        let line = find_member_by_id(&conn, "abc123").expect("find");
        assert!(line.contains("abc123"));
        assert!(line.contains("allowed"));
        assert!(!line.contains("192.168"));
        assert_eq!(get(&conn, "abc123").expect("get").expect("row").address, "");
    }

    #[test]
    fn test_list_members() {
        let conn = test_db();
        save_member(&conn, "member2", ip("10.0.0.2"), NOW, "blocked", NOW).expect("save");
        save_member(&conn, "member1", ip("10.0.0.1"), NOW, "allowed", NOW).expect("save");

        let members = list_members(&conn).expect("list");
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member_id, "member1");
        assert_eq!(members[1].status, "blocked");
    }

    #[test]
    fn test_stale_member_not_saved() {
        let conn = test_db();
        let outcome = save_member(
            &conn,
            "oldmember",
            ip("10.0.0.1"),
            NOW - 31 * SECS_PER_DAY,
            "allowed",
            NOW,
        )
        .expect("save");
        assert_eq!(outcome, SaveOutcome::Stale);
        assert_eq!(find_member_by_id(&conn, "oldmember").expect("find"), "");
    }

    #[test]
    fn test_recent_member_saved() {
        let conn = test_db();
        save_member(&conn, "m", ip("10.0.0.1"), NOW - SECS_PER_DAY, "allowed", NOW)
            .expect("save");
        assert!(!find_member_by_id(&conn, "m").expect("find").is_empty());
    }

    #[test]
    fn test_freshness_boundary() {
        assert!(is_fresh(NOW - FRESHNESS_HORIZON_SECS, NOW));
        assert!(!is_fresh(NOW - FRESHNESS_HORIZON_SECS - 1, NOW));
        // Clock skew: observation from the future is fresh.
        assert!(is_fresh(NOW + 60, NOW));
    }

    #[test]
    fn test_upsert_overwrites() {
        let conn = test_db();
        save_member(&conn, "m", ip("10.0.0.1"), NOW - 100, "allowed", NOW).expect("save");
        save_member(&conn, "m", ip("10.0.0.9"), NOW, "blocked", NOW).expect("save");

        let members = list_members(&conn).expect("list");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].address, "10.0.0.9");
        assert_eq!(members[0].status, "blocked");
        assert_eq!(members[0].last_seen, NOW);
    }

    #[test]
    fn test_stale_write_leaves_existing_row() {
        let conn = test_db();
        save_member(&conn, "m", ip("10.0.0.1"), NOW, "allowed", NOW).expect("save");
        save_member(&conn, "m", ip("10.0.0.9"), NOW - 40 * SECS_PER_DAY, "blocked", NOW)
            .expect("save");

        let row = get(&conn, "m").expect("get").expect("row");
        assert_eq!(row.address, "10.0.0.1");
        assert_eq!(row.status, "allowed");
    }
}
