use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, hours_modifier};
use crate::Database;
use crate::models::SessionRow;

const SESSION_COLUMNS: &str = "id, external_id, group_id, title, description, created_at, started_at, ended_at, expires_at,
     (ended_at IS NULL AND expires_at > datetime('now')) AS is_active";

impl Database {
    pub fn create_session(
        &self,
        external_id: Option<i64>,
        group_id: Option<i64>,
        title: &str,
        description: Option<&str>,
        ttl_hours: i64,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| insert_session(conn, external_id, group_id, title, description, ttl_hours))
    }

    pub fn get_session(&self, id: i64) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, id))
    }

    /// Latest still-active session created for a legacy session id.
    pub fn find_active_session_by_external_id(&self, external_id: i64) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_active_by_external_id(conn, external_id))
    }

    /// Stamp `started_at` once. Returns false if the session had already started.
    pub fn mark_session_started(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET started_at = datetime('now') WHERE id = ?1 AND started_at IS NULL",
                [id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Stamp `ended_at` once. Returns false if the session had already ended.
    pub fn mark_session_ended(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET ended_at = datetime('now') WHERE id = ?1 AND ended_at IS NULL",
                [id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Close every session whose TTL has run out. Returns how many were closed.
    pub fn expire_sessions(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET ended_at = expires_at
                 WHERE ended_at IS NULL AND expires_at <= datetime('now')",
                [],
            )?;
            Ok(changed)
        })
    }
}

pub(crate) fn insert_session(
    conn: &Connection,
    external_id: Option<i64>,
    group_id: Option<i64>,
    title: &str,
    description: Option<&str>,
    ttl_hours: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO sessions (external_id, group_id, title, description, expires_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now', ?5))",
        rusqlite::params![external_id, group_id, title, description, hours_modifier(ttl_hours)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn query_active_by_external_id(conn: &Connection, external_id: i64) -> Result<Option<SessionRow>> {
    let sql = format!(
        "SELECT {} FROM sessions
         WHERE external_id = ?1 AND ended_at IS NULL AND expires_at > datetime('now')
         ORDER BY id DESC LIMIT 1",
        SESSION_COLUMNS
    );
    conn.query_row(&sql, [external_id], map_session).optional()
}

pub(crate) fn query_session(conn: &Connection, id: i64) -> Result<Option<SessionRow>> {
    let sql = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
    conn.query_row(&sql, [id], map_session).optional()
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        group_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
        started_at: row.get(6)?,
        ended_at: row.get(7)?,
        expires_at: row.get(8)?,
        is_active: row.get(9)?,
    })
}
