use rusqlite::Connection;

use crate::error::{Result, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    // Checkpoint every ~400KB instead of the default ~4MB
    conn.pragma_update(None, "wal_autocheckpoint", 100)?;

    // Errors are non-fatal: in-memory DBs and fresh files legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS emotional_states (
            user_id             TEXT PRIMARY KEY,
            valence             REAL NOT NULL,
            arousal             REAL NOT NULL,
            connection          REAL NOT NULL,
            curiosity           REAL NOT NULL,
            energy              REAL NOT NULL,
            baseline_valence    REAL NOT NULL,
            baseline_arousal    REAL NOT NULL,
            baseline_connection REAL NOT NULL,
            baseline_curiosity  REAL NOT NULL,
            baseline_energy     REAL NOT NULL,
            recent_emotions     TEXT NOT NULL DEFAULT '[]',
            last_updated        INTEGER NOT NULL
        );
        ",
    )?;

    if let Some(found) = get_schema_version(conn)?
        && found > SCHEMA_VERSION
    {
        return Err(StoreError::InvalidData(format!(
            "database schema v{found} is newer than this build (v{SCHEMA_VERSION})"
        )));
    }

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
