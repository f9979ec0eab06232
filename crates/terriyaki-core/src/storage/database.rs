//! SQLite handle shared by the engine.
//!
//! A single connection sits behind a mutex. Reads go through
//! [`Database::with_conn`]; every multi-statement write goes through
//! [`Database::transaction`], which holds the lock for the whole
//! `BEGIN IMMEDIATE` .. `COMMIT` span.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tracing::warn;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file at `path` and bring its schema up
    /// to date.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init(conn)
    }

    /// Open `file` inside the data directory.
    pub fn open_in_data_dir(file: &str) -> Result<Self> {
        let path = data_dir()?.join(file);
        Self::open(&path)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CoreError::Database(DatabaseError::Locked))
    }

    /// Run read-only or single-statement work against the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an IMMEDIATE transaction. Any error rolls back.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(&conn) {
            Ok(value) => match conn.execute_batch("COMMIT;") {
                Ok(()) => Ok(value),
                Err(e) => {
                    rollback(&conn);
                    Err(e.into())
                }
            },
            Err(e) => {
                rollback(&conn);
                Err(e)
            }
        }
    }
}

fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute_batch("ROLLBACK;") {
        warn!(error = %e, "rollback failed");
    }
}
