use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_ts, parse_ts};
use crate::error::Result;
use crate::grind::Grind;

const GRIND_COLUMNS: &str = "g.id, g.duration, g.budget, g.start_date, g.created_at, g.updated_at";

/// Builds a grind without participants; callers fill them in.
fn row_to_grind(row: &Row) -> rusqlite::Result<Grind> {
    let start_date: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Grind {
        id: row.get(0)?,
        duration: row.get(1)?,
        budget: row.get(2)?,
        start_date: parse_ts(3, &start_date)?,
        participants: Vec::new(),
        created_at: parse_ts(4, &created_at)?,
        updated_at: parse_ts(5, &updated_at)?,
    })
}

fn with_participants(conn: &Connection, mut grind: Grind) -> Result<Grind> {
    grind.participants = participants(conn, &grind.id)?;
    Ok(grind)
}

pub fn insert_grind(conn: &Connection, grind: &Grind) -> Result<()> {
    conn.execute(
        "INSERT INTO grinds (id, duration, budget, start_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            grind.id,
            grind.duration,
            grind.budget,
            format_ts(&grind.start_date),
            format_ts(&grind.created_at),
            format_ts(&grind.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_grind(conn: &Connection, id: &str) -> Result<Option<Grind>> {
    let grind = conn
        .query_row(
            &format!("SELECT {GRIND_COLUMNS} FROM grinds g WHERE g.id = ?1"),
            params![id],
            row_to_grind,
        )
        .optional()?;
    grind.map(|g| with_participants(conn, g)).transpose()
}

pub fn grind_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM grinds WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// User ids of every participant, in join order. Quitters are included.
pub fn participants(conn: &Connection, grind_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM participate_records WHERE grind_id = ?1 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![grind_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn update_grind(
    conn: &Connection,
    id: &str,
    duration: i64,
    budget: i64,
    updated_at: &DateTime<Utc>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE grinds SET duration = ?2, budget = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, duration, budget, format_ts(updated_at)],
    )?)
}

pub fn delete_grind(conn: &Connection, id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM grinds WHERE id = ?1", params![id])?)
}

/// Every grind the user has a record in, newest first.
pub fn grinds_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Grind>> {
    list_with_filter(conn, user_id, "")
}

/// Grinds the user joined and has not quit, newest first.
pub fn active_grinds_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Grind>> {
    list_with_filter(conn, user_id, "AND r.quitted = 0")
}

fn list_with_filter(conn: &Connection, user_id: &str, filter: &str) -> Result<Vec<Grind>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {GRIND_COLUMNS}
         FROM grinds g
         JOIN participate_records r ON r.grind_id = g.id
         WHERE r.user_id = ?1 {filter}
         ORDER BY g.created_at DESC, g.id DESC"
    ))?;
    let grinds = stmt
        .query_map(params![user_id], row_to_grind)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    grinds
        .into_iter()
        .map(|g| with_participants(conn, g))
        .collect()
}
