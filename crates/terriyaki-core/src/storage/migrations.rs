//! Database schema migrations for terriyaki.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: users, grinds, participation records and daily tasks.
///
/// Tasks carry a `day` column (UTC `YYYY-MM-DD` of `date`) so that siblings
/// can be grouped and so a participant never gets two tasks on one day.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            avatar      TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS grinds (
            id          TEXT PRIMARY KEY,
            duration    INTEGER NOT NULL CHECK (duration > 0),
            budget      INTEGER NOT NULL CHECK (budget >= 0),
            start_date  TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS participate_records (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id        TEXT NOT NULL REFERENCES users(id),
            grind_id       TEXT NOT NULL REFERENCES grinds(id) ON DELETE CASCADE,
            missed_days    INTEGER NOT NULL DEFAULT 0,
            total_penalty  INTEGER NOT NULL DEFAULT 0,
            quitted        INTEGER NOT NULL DEFAULT 0,
            quitted_at     TEXT,
            joined_at      TEXT NOT NULL,
            UNIQUE (user_id, grind_id)
        );

        CREATE INDEX IF NOT EXISTS idx_records_grind ON participate_records(grind_id);

        CREATE TABLE IF NOT EXISTS tasks (
            id                   TEXT PRIMARY KEY,
            user_id              TEXT NOT NULL REFERENCES users(id),
            grind_id             TEXT NOT NULL REFERENCES grinds(id) ON DELETE CASCADE,
            date                 TEXT NOT NULL,
            day                  TEXT NOT NULL,
            completed            INTEGER NOT NULL DEFAULT 0,
            finished_time        TEXT,
            code                 TEXT,
            code_language        TEXT,
            problem_title        TEXT,
            problem_description  TEXT,
            problem_url          TEXT,
            problem_difficulty   TEXT,
            problem_topic_tags   TEXT,
            UNIQUE (grind_id, user_id, day)
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_grind_day ON tasks(grind_id, day);
        CREATE INDEX IF NOT EXISTS idx_tasks_user_grind_date ON tasks(user_id, grind_id, date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: messages and invitations.
///
/// `invitation_grind_id` is not a foreign key; invitations outlive the grind
/// they point at.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id                   TEXT PRIMARY KEY,
            sender_id            TEXT NOT NULL,
            receiver_id          TEXT NOT NULL,
            content              TEXT NOT NULL,
            message_type         TEXT NOT NULL DEFAULT 'general',
            invitation_grind_id  TEXT,
            invitation_status    TEXT,
            is_read              INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            CHECK (sender_id <> receiver_id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
