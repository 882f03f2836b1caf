//! Ban list keyed by network address.
//!
//! Addresses are stored in the canonical text form of [`IpAddr`], the same
//! form [`super::members::save_member`] writes, so the two join directly.

use std::net::IpAddr;

use rusqlite::Connection;
use warden_types::{format_timestamp, BLOCKED_STATUS};

use crate::{to_sql_time, Result};

/// Ban an address. Re-banning keeps the original `banned_at`.
pub fn ban(conn: &Connection, address: IpAddr, now: u64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO bans (address, banned_at) VALUES (?1, ?2)",
        rusqlite::params![address.to_string(), to_sql_time(now)?],
    )?;
    Ok(())
}

/// Lift a ban. Returns whether a ban existed.
pub fn unban(conn: &Connection, address: IpAddr) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM bans WHERE address = ?1",
        [address.to_string()],
    )?;
    Ok(removed > 0)
}

/// All bans, ordered by address.
pub fn list(conn: &Connection) -> Result<Vec<BanRow>> {
    let mut stmt = conn.prepare("SELECT address, banned_at FROM bans ORDER BY address")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(BanRow {
                address: row.get(0)?,
                banned_at: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// One line per ban.
pub fn list_bans(conn: &Connection) -> Result<Vec<String>> {
    Ok(list(conn)?.iter().map(BanRow::describe).collect())
}

/// Member ids whose address is banned and whose status is not yet blocked.
pub fn find_members_to_block(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT m.member_id FROM network_members m
         JOIN bans b ON b.address = m.address
         WHERE m.address != '' AND m.status != ?1
         ORDER BY m.member_id",
    )?;

    let ids = stmt
        .query_map([BLOCKED_STATUS], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(ids)
}

/// A raw ban row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRow {
    pub address: String,
    pub banned_at: u64,
}

impl BanRow {
    pub fn describe(&self) -> String {
        format!("{} (banned {})", self.address, format_timestamp(self.banned_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::members::save_member;

    const NOW: u64 = 1_700_000_000;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().expect("ip")
    }

    #[test]
    fn test_ban_and_list_bans() {
        let conn = test_db();
        ban(&conn, ip("192.168.1.100"), NOW).expect("ban");

        let bans = list_bans(&conn).expect("list");
        assert_eq!(bans.len(), 1);
        assert!(bans[0].contains("192.168.1.100"));
    }

    #[test]
    fn test_ban_is_idempotent() {
        let conn = test_db();
        ban(&conn, ip("192.168.1.100"), NOW).expect("ban");
        ban(&conn, ip("192.168.1.100"), NOW + 50).expect("re-ban");

        let rows = list(&conn).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].banned_at, NOW);
    }

    #[test]
    fn test_ban_canonicalizes_address() {
        let conn = test_db();
        ban(&conn, ip("fd00:0::1"), NOW).expect("ban");
        ban(&conn, ip("fd00::0:1"), NOW).expect("ban");
        assert_eq!(list(&conn).expect("list")[0].address, "fd00::1");
        assert_eq!(list(&conn).expect("list").len(), 1);
    }

    #[test]
    fn test_remove_ban() {
        let conn = test_db();
        ban(&conn, ip("192.168.1.100"), NOW).expect("ban");
        assert!(unban(&conn, ip("192.168.1.100")).expect("unban"));

        assert!(list_bans(&conn).expect("list").is_empty());
    }

    #[test]
    fn test_remove_missing_ban_is_noop() {
        let conn = test_db();
        assert!(!unban(&conn, ip("192.168.1.100")).expect("unban"));
    }

    #[test]
    fn test_find_members_to_block() {
        let conn = test_db();
        save_member(&conn, "member1", Some(ip("192.168.1.100")), NOW, "allowed", NOW)
            .expect("save");
        save_member(&conn, "member2", Some(ip("192.168.1.101")), NOW, "allowed", NOW)
            .expect("save");
        ban(&conn, ip("192.168.1.100"), NOW).expect("ban");

        let to_block = find_members_to_block(&conn).expect("find");
        assert_eq!(to_block, vec!["member1".to_string()]);
    }

    #[test]
    fn test_already_blocked_not_in_find_members_to_block() {
        let conn = test_db();
        save_member(&conn, "member1", Some(ip("192.168.1.100")), NOW, "blocked", NOW)
            .expect("save");
        ban(&conn, ip("192.168.1.100"), NOW).expect("ban");

        assert!(find_members_to_block(&conn).expect("find").is_empty());
    }

    #[test]
    fn test_members_sharing_banned_address() {
        let conn = test_db();
        save_member(&conn, "b", Some(ip("10.0.0.1")), NOW, "unknown", NOW).expect("save");
        save_member(&conn, "a", Some(ip("10.0.0.1")), NOW, "allowed", NOW).expect("save");
        save_member(&conn, "c", None, NOW, "allowed", NOW).expect("save");
        ban(&conn, ip("10.0.0.1"), NOW).expect("ban");

        assert_eq!(
            find_members_to_block(&conn).expect("find"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_find_members_to_block_is_read_only() {
        let conn = test_db();
        save_member(&conn, "m", Some(ip("10.0.0.1")), NOW, "allowed", NOW).expect("save");
        ban(&conn, ip("10.0.0.1"), NOW).expect("ban");

        let first = find_members_to_block(&conn).expect("first");
        let second = find_members_to_block(&conn).expect("second");
        assert_eq!(first, second);
    }
}
