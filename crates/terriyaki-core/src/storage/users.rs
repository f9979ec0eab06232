use rusqlite::{params, Connection, OptionalExtension, Row};

use super::database::Database;
use super::{format_ts, parse_ts};
use crate::error::{CoreError, Result};
use crate::user::{User, UserDirectory};

const USER_COLUMNS: &str = "id, username, email, avatar, created_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        avatar: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
    })
}

/// Insert a user. Returns `false` when the email is already taken.
pub fn insert_user(conn: &Connection, user: &User) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO users (id, username, email, avatar, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(email) DO NOTHING",
        params![
            user.id,
            user.username,
            user.email,
            user.avatar,
            format_ts(&user.created_at),
        ],
    )?;
    Ok(inserted == 1)
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()?)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            row_to_user,
        )
        .optional()?)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username"
    ))?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

/// Resolve an email or a user id against an open connection.
pub fn resolve(conn: &Connection, email_or_id: &str) -> Result<User> {
    let key = email_or_id.trim();
    let found = if key.contains('@') {
        get_user_by_email(conn, key)?
    } else {
        get_user(conn, key)?
    };
    found.ok_or_else(|| CoreError::UserNotFound(key.to_string()))
}

impl UserDirectory for Database {
    fn resolve(&self, email_or_id: &str) -> Result<User> {
        self.with_conn(|conn| resolve(conn, email_or_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            username: id.into(),
            email: email.into(),
            avatar: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_by_email_or_id() {
        let db = Database::open_memory().unwrap();
        db.with_conn(|conn| insert_user(conn, &user("u1", "alice@example.com")))
            .unwrap();

        assert_eq!(db.resolve("u1").unwrap().email, "alice@example.com");
        assert_eq!(db.resolve("Alice@Example.com").unwrap().id, "u1");
        assert!(db.resolve("bob@example.com").unwrap_err().is_not_found());
        assert!(db.resolve("u2").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_email_is_not_inserted() {
        let db = Database::open_memory().unwrap();
        let inserted = db
            .with_conn(|conn| {
                let first = insert_user(conn, &user("u1", "a@x.io"))?;
                let second = insert_user(conn, &user("u2", "a@x.io"))?;
                Ok((first, second))
            })
            .unwrap();
        assert_eq!(inserted, (true, false));
        assert_eq!(db.with_conn(list_users).unwrap().len(), 1);
    }
}
