use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::{ParticipantRow, UserRow};

/// Profile fields written on registration.
#[derive(Debug, Clone, Default)]
pub struct UserProfile<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub country: Option<&'a str>,
    pub city: Option<&'a str>,
}

impl Database {
    // -- Users --

    /// Create the user, or refresh its profile on rejoin.
    /// Returns true when the user already existed.
    pub fn upsert_user(&self, user_id: &str, profile: &UserProfile<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existed: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
                [user_id],
                |row| row.get(0),
            )?;

            conn.execute(
                "INSERT INTO users (user_id, name, email, country, city) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    name = excluded.name,
                    email = COALESCE(excluded.email, users.email),
                    country = COALESCE(excluded.country, users.country),
                    city = COALESCE(excluded.city, users.city),
                    modified_at = datetime('now')",
                rusqlite::params![user_id, profile.name, profile.email, profile.country, profile.city],
            )?;
            Ok(existed)
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, name, email, country, city, created_at, modified_at
                 FROM users WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(UserRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        country: row.get(3)?,
                        city: row.get(4)?,
                        created_at: row.get(5)?,
                        modified_at: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Registrations --

    /// Returns true when this is the user's first registration in the session.
    pub fn register_participant(&self, session_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO registrations (session_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![session_id, user_id],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn is_registered(&self, session_id: i64, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM registrations WHERE session_id = ?1 AND user_id = ?2)",
                rusqlite::params![session_id, user_id],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    pub fn count_participants(&self, session_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM registrations WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    /// Roster in join order. `name` is `None` if the user row has gone missing.
    pub fn list_participants(&self, session_id: i64) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.user_id, u.name, u.country, u.city, r.joined_at
                 FROM registrations r
                 LEFT JOIN users u ON r.user_id = u.user_id
                 WHERE r.session_id = ?1
                 ORDER BY r.id",
            )?;

            let rows = stmt
                .query_map([session_id], |row| {
                    Ok(ParticipantRow {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        country: row.get(2)?,
                        city: row.get(3)?,
                        joined_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
