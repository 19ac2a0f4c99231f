use anyhow::Result;
use rusqlite::{Connection, Row};

use noor_types::models::Role;

use super::{OptionalExt, hours_modifier};
use crate::Database;
use crate::models::TokenRow;

const TOKEN_COLUMNS: &str =
    "token, session_id, role, created_at, expires_at, is_active, access_count, last_accessed_at";

impl Database {
    /// Insert a token. Returns false when the token string is already taken,
    /// so the caller can draw another one.
    pub fn insert_token(&self, token: &str, session_id: i64, role: Role, ttl_hours: i64) -> Result<bool> {
        self.with_conn_mut(|conn| insert_token(conn, token, session_id, role, ttl_hours))
    }

    /// Resolve an active, unexpired token and record the access.
    /// Returns `None` for unknown, revoked or expired tokens.
    pub fn validate_token(&self, token: &str) -> Result<Option<TokenRow>> {
        self.with_conn_mut(|conn| {
            let touched = conn.execute(
                "UPDATE session_tokens
                 SET access_count = access_count + 1, last_accessed_at = datetime('now')
                 WHERE token = ?1 AND is_active = 1 AND expires_at > datetime('now')",
                [token],
            )?;
            if touched == 0 {
                return Ok(None);
            }

            let sql = format!("SELECT {} FROM session_tokens WHERE token = ?1", TOKEN_COLUMNS);
            conn.query_row(&sql, [token], map_token).optional()
        })
    }

    /// Raw lookup with no side effects.
    pub fn get_token(&self, token: &str) -> Result<Option<TokenRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM session_tokens WHERE token = ?1", TOKEN_COLUMNS);
            conn.query_row(&sql, [token], map_token).optional()
        })
    }

    /// Most recently issued usable token of a role for a session.
    pub fn get_active_token(&self, session_id: i64, role: Role) -> Result<Option<TokenRow>> {
        self.with_conn(|conn| query_active_token(conn, session_id, role))
    }

    pub fn revoke_session_tokens(&self, session_id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE session_tokens SET is_active = 0 WHERE session_id = ?1 AND is_active = 1",
                [session_id],
            )?;
            Ok(changed)
        })
    }

    pub fn deactivate_expired_tokens(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE session_tokens SET is_active = 0
                 WHERE is_active = 1 AND expires_at <= datetime('now')",
                [],
            )?;
            Ok(changed)
        })
    }
}

pub(crate) fn insert_token(conn: &Connection, token: &str, session_id: i64, role: Role, ttl_hours: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO session_tokens (token, session_id, role, expires_at)
         VALUES (?1, ?2, ?3, datetime('now', ?4))",
        rusqlite::params![token, session_id, role.as_str(), hours_modifier(ttl_hours)],
    )?;
    Ok(inserted == 1)
}

pub(crate) fn query_active_token(conn: &Connection, session_id: i64, role: Role) -> Result<Option<TokenRow>> {
    let sql = format!(
        "SELECT {} FROM session_tokens
         WHERE session_id = ?1 AND role = ?2 AND is_active = 1 AND expires_at > datetime('now')
         ORDER BY created_at DESC LIMIT 1",
        TOKEN_COLUMNS
    );
    conn.query_row(&sql, rusqlite::params![session_id, role.as_str()], map_token)
        .optional()
}

fn map_token(row: &Row<'_>) -> rusqlite::Result<TokenRow> {
    Ok(TokenRow {
        token: row.get(0)?,
        session_id: row.get(1)?,
        role: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        is_active: row.get(5)?,
        access_count: row.get(6)?,
        last_accessed_at: row.get(7)?,
    })
}
