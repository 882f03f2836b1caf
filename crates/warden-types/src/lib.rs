//! # warden-types
//!
//! Shared domain types used across the warden workspace: the remote
//! network-management wire format, the game-list side file, and the
//! time horizons that govern what the store keeps.

pub mod gamelist;
pub mod network;

use chrono::DateTime;

/// Unix epoch seconds.
pub type Timestamp = u64;

/// Seconds per day.
pub const SECS_PER_DAY: u64 = 86_400;

/// Membership observations older than this are never persisted (30 days).
///
/// An observation is stale when `now - last_seen` is strictly greater.
pub const FRESHNESS_HORIZON_SECS: u64 = 30 * SECS_PER_DAY;

/// Default sighting retention (14 days).
///
/// Rows strictly older than `now - retention` are purged.
pub const DEFAULT_RETENTION_SECS: u64 = 14 * SECS_PER_DAY;

/// Name of the tag carrying a member's access status.
pub const STATUS_TAG: &str = "status";

/// Status value of a member that is already blocked.
pub const BLOCKED_STATUS: &str = "blocked";

/// Status recorded when a member carries no resolvable status tag.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Current wall-clock time as Unix epoch seconds.
pub fn now() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Render a timestamp as `YYYY-MM-DD HH:MM:SS` (UTC, no zone suffix).
pub fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
