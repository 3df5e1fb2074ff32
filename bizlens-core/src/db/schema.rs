//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    CREATE TABLE IF NOT EXISTS analyses (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL,
        dataset_id     TEXT,
        question       TEXT NOT NULL,
        answer         TEXT NOT NULL,
        industry       TEXT NOT NULL,

        -- Metrics snapshot at analysis time
        row_count      INTEGER NOT NULL,
        column_count   INTEGER NOT NULL,
        total_revenue  REAL NOT NULL,
        avg_revenue    REAL NOT NULL,

        prompt_hash    TEXT,
        created_at     DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_analyses_user_created
        ON analyses(user_id, created_at DESC);
    "#,
];

/// Apply any pending migrations to the connection.
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (index, migration) in MIGRATIONS.iter().enumerate() {
        let version = index as i32 + 1;
        if version > current {
            tracing::info!(version, "Applying database migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}
