//! SQLite DDL definitions for the standup store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Current schema version stamp.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the standup database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent. Times of
/// day (deadlines, timetable slots) are stored as seconds since midnight UTC;
/// instants (`created_at`) as unix seconds.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

-- Enforce foreign key constraints (timetable cascade on member delete).
PRAGMA foreign_keys = ON;

-- Schema version tracking.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Tracked channels. deadline NULL means no channel-wide deadline.
CREATE TABLE IF NOT EXISTS channels (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id TEXT NOT NULL UNIQUE,
    name       TEXT NOT NULL,
    deadline   INTEGER             -- seconds since midnight, NULL = none
);

-- Standup obligations: one row per (person, channel).
CREATE TABLE IF NOT EXISTS channel_members (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    TEXT NOT NULL,
    channel_id TEXT NOT NULL,
    real_name  TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, channel_id)
);

CREATE INDEX IF NOT EXISTS idx_members_channel ON channel_members(channel_id);
CREATE INDEX IF NOT EXISTS idx_members_user    ON channel_members(user_id);

-- Per-weekday deadline overrides, one-to-one with a member.
CREATE TABLE IF NOT EXISTS timetables (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_member_id INTEGER NOT NULL UNIQUE
        REFERENCES channel_members(id) ON DELETE CASCADE,
    monday    INTEGER,
    tuesday   INTEGER,
    wednesday INTEGER,
    thursday  INTEGER,
    friday    INTEGER,
    saturday  INTEGER,
    sunday    INTEGER
);

-- Validated reports. message_ts locates a row when the originating chat
-- message is edited or deleted; placeholder rows share coarse timestamps, so
-- no uniqueness is enforced.
CREATE TABLE IF NOT EXISTS standups (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    comment    TEXT NOT NULL,
    message_ts TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_standups_channel_day ON standups(channel_id, created_at);
CREATE INDEX IF NOT EXISTS idx_standups_user        ON standups(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_standups_ts          ON standups(message_ts);

"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Inserts the current schema version into
/// `schema_meta` if not already present.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Seed schema version if this is a fresh database.
    let version_str = CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![version_str],
    )?;

    Ok(())
}

/// Read the current schema version from the database.
///
/// Returns `None` if the `schema_meta` table is empty or the key is missing.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
