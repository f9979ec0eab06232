use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_ts, parse_opt_ts, parse_ts};
use crate::error::Result;
use crate::participation::ParticipateRecord;

const RECORD_COLUMNS: &str =
    "user_id, grind_id, missed_days, total_penalty, quitted, quitted_at, joined_at";

fn row_to_record(row: &Row) -> rusqlite::Result<ParticipateRecord> {
    let joined_at: String = row.get(6)?;
    Ok(ParticipateRecord {
        user_id: row.get(0)?,
        grind_id: row.get(1)?,
        missed_days: row.get(2)?,
        total_penalty: row.get(3)?,
        quitted: row.get(4)?,
        quitted_at: parse_opt_ts(5, row.get(5)?)?,
        joined_at: parse_ts(6, &joined_at)?,
    })
}

/// Get-or-create in one statement. Returns `true` when a row was created.
pub fn insert_record_if_absent(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
    joined_at: &DateTime<Utc>,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO participate_records (user_id, grind_id, joined_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, grind_id) DO NOTHING",
        params![user_id, grind_id, format_ts(joined_at)],
    )?;
    Ok(inserted == 1)
}

pub fn get_record(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
) -> Result<Option<ParticipateRecord>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM participate_records
                 WHERE user_id = ?1 AND grind_id = ?2"
            ),
            params![user_id, grind_id],
            row_to_record,
        )
        .optional()?)
}

pub fn list_records(conn: &Connection, grind_id: &str) -> Result<Vec<ParticipateRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM participate_records WHERE grind_id = ?1 ORDER BY id"
    ))?;
    let records = stmt
        .query_map(params![grind_id], row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Store recomputed accounting for an active participant. The missed-day
/// counter never goes down.
pub fn store_accounting(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
    missed_days: i64,
    total_penalty: i64,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE participate_records
         SET missed_days = MAX(missed_days, ?3), total_penalty = ?4
         WHERE user_id = ?1 AND grind_id = ?2 AND quitted = 0",
        params![user_id, grind_id, missed_days, total_penalty],
    )?)
}

/// Flip the record to quitted. Affects nothing if it already was.
pub fn mark_quitted(
    conn: &Connection,
    user_id: &str,
    grind_id: &str,
    missed_days: i64,
    total_penalty: i64,
    quitted_at: &DateTime<Utc>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE participate_records
         SET quitted = 1, quitted_at = ?5,
             missed_days = MAX(missed_days, ?3), total_penalty = ?4
         WHERE user_id = ?1 AND grind_id = ?2 AND quitted = 0",
        params![
            user_id,
            grind_id,
            missed_days,
            total_penalty,
            format_ts(quitted_at)
        ],
    )?)
}

pub fn delete_record(conn: &Connection, user_id: &str, grind_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM participate_records WHERE user_id = ?1 AND grind_id = ?2",
        params![user_id, grind_id],
    )?)
}

pub fn delete_records_for_grind(conn: &Connection, grind_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM participate_records WHERE grind_id = ?1",
        params![grind_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn seed(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "INSERT INTO users (id, username, email, created_at) VALUES ('a', 'a', 'a@x.io', '2024-01-01T00:00:00Z');
             INSERT INTO grinds (id, duration, budget, start_date, created_at, updated_at)
                 VALUES ('g', 3, 90, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z');",
        )?;
        Ok(())
    }

    #[test]
    fn insert_is_get_or_create() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let (first, second, all) = db
            .with_conn(|conn| {
                seed(conn)?;
                let first = insert_record_if_absent(conn, "a", "g", &now)?;
                let second = insert_record_if_absent(conn, "a", "g", &now)?;
                Ok((first, second, list_records(conn, "g")?))
            })
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn accounting_counter_only_rises() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let record = db
            .with_conn(|conn| {
                seed(conn)?;
                insert_record_if_absent(conn, "a", "g", &now)?;
                store_accounting(conn, "a", "g", 2, 60)?;
                store_accounting(conn, "a", "g", 1, 30)?;
                get_record(conn, "a", "g")
            })
            .unwrap()
            .unwrap();
        assert_eq!(record.missed_days, 2);
    }

    #[test]
    fn quit_applies_once() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let (first, second, record) = db
            .with_conn(|conn| {
                seed(conn)?;
                insert_record_if_absent(conn, "a", "g", &now)?;
                let first = mark_quitted(conn, "a", "g", 1, 90, &now)?;
                let second = mark_quitted(conn, "a", "g", 2, 90, &now)?;
                // frozen: later accounting writes are ignored
                store_accounting(conn, "a", "g", 3, 90)?;
                Ok((first, second, get_record(conn, "a", "g")?))
            })
            .unwrap();
        assert_eq!((first, second), (1, 0));
        let record = record.unwrap();
        assert!(record.quitted);
        assert_eq!(record.missed_days, 1);
        assert_eq!(record.total_penalty, 90);
        assert!(record.quitted_at.is_some());
    }
}
