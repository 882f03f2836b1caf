//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are forward-only.

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Initialize a fresh database or check an existing one's version.
///
/// Only v1 exists; a database at a newer version is rejected.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbError::Sqlite)?;

    if current_version == 0 {
        // Fresh database
        tracing::info!("Initializing database schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V1)
            .map_err(DbError::Sqlite)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(DbError::Sqlite)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "Database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}
