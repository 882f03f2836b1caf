//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Activity log (append-only, purged by retention)
-- ============================================================

CREATE TABLE IF NOT EXISTS member_sightings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    player_name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    observed_at INTEGER NOT NULL,
    -- 1 when the address is the game host's, not the player's own
    via_host INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_member_sightings_name ON member_sightings(name_key);
CREATE INDEX IF NOT EXISTS idx_member_sightings_time ON member_sightings(observed_at);

CREATE TABLE IF NOT EXISTS player_sightings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_name TEXT NOT NULL,
    game_name TEXT NOT NULL,
    game_key TEXT NOT NULL,
    observed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_player_sightings_game ON player_sightings(game_key);
CREATE INDEX IF NOT EXISTS idx_player_sightings_time ON player_sightings(observed_at);

-- ============================================================
-- Membership snapshot
-- ============================================================

CREATE TABLE IF NOT EXISTS network_members (
    member_id TEXT PRIMARY KEY,
    address TEXT NOT NULL DEFAULT '',
    last_seen INTEGER NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_network_members_address ON network_members(address);

-- ============================================================
-- Ban list
-- ============================================================

CREATE TABLE IF NOT EXISTS bans (
    address TEXT PRIMARY KEY,
    banned_at INTEGER NOT NULL
);
"#;
