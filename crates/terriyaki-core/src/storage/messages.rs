use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_ts, parse_ts};
use crate::error::Result;
use crate::message::{InvitationStatus, Message, MessageType};

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, message_type, invitation_grind_id,
     invitation_status, is_read, created_at, updated_at";

fn conversion_error(idx: usize, err: crate::error::ValidationError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let message_type: String = row.get(4)?;
    let status: Option<String> = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        message_type: message_type
            .parse::<MessageType>()
            .map_err(|e| conversion_error(4, e))?,
        invitation_grind_id: row.get(5)?,
        invitation_status: status
            .map(|s| s.parse::<InvitationStatus>())
            .transpose()
            .map_err(|e| conversion_error(6, e))?,
        read: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

pub fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, sender_id, receiver_id, content, message_type, invitation_grind_id,
                               invitation_status, is_read, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            message.id,
            message.sender_id,
            message.receiver_id,
            message.content,
            message.message_type.as_str(),
            message.invitation_grind_id,
            message.invitation_status.map(|s| s.as_str()),
            message.read,
            format_ts(&message.created_at),
            format_ts(&message.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: &str) -> Result<Option<Message>> {
    Ok(conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![id],
            row_to_message,
        )
        .optional()?)
}

/// Messages received by `user_id`, newest first.
pub fn inbox(conn: &Connection, user_id: &str, offset: u32, limit: u32) -> Result<Vec<Message>> {
    page(conn, "receiver_id", user_id, offset, limit)
}

/// Messages sent by `user_id`, newest first.
pub fn sent(conn: &Connection, user_id: &str, offset: u32, limit: u32) -> Result<Vec<Message>> {
    page(conn, "sender_id", user_id, offset, limit)
}

fn page(conn: &Connection, column: &str, user_id: &str, offset: u32, limit: u32) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE {column} = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2 OFFSET ?3"
    ))?;
    let messages = stmt
        .query_map(params![user_id, limit, offset], row_to_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

pub fn mark_read(conn: &Connection, id: &str, at: &DateTime<Utc>) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE messages SET is_read = 1, updated_at = ?2 WHERE id = ?1 AND is_read = 0",
        params![id, format_ts(at)],
    )?)
}

/// Move a pending invitation to `status`. Affects nothing if it was no
/// longer pending.
pub fn resolve_invitation(
    conn: &Connection,
    id: &str,
    status: InvitationStatus,
    at: &DateTime<Utc>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE messages SET invitation_status = ?2, updated_at = ?3
         WHERE id = ?1 AND message_type = 'invitation' AND invitation_status = 'pending'",
        params![id, status.as_str(), format_ts(at)],
    )?)
}
