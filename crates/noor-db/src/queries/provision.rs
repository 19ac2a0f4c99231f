use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use noor_types::models::Role;

use super::sessions::{insert_session, query_active_by_external_id, query_session};
use super::tokens::{insert_token, query_active_token};
use crate::Database;
use crate::models::SessionRow;

/// Collisions are rare at 32^8; give up after a few draws.
const MAX_TOKEN_DRAWS: usize = 5;

/// Fields of a session about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewSession<'a> {
    pub external_id: Option<i64>,
    pub group_id: Option<i64>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub ttl_hours: i64,
}

/// A session together with its live host and participant tokens.
#[derive(Debug, Clone)]
pub struct ProvisionedSession {
    pub session: SessionRow,
    pub host_token: String,
    pub user_token: String,
    /// True when an active session with the same external id was returned.
    pub reused: bool,
}

impl Database {
    /// Return the active session for `new.external_id` (or create one) and
    /// make sure it has a usable token per role. `draw_token` supplies
    /// candidate token strings.
    ///
    /// Lookup, insert and token issue run in one transaction under the
    /// connection lock, so concurrent calls for one external id converge on
    /// the same session and tokens.
    pub fn provision_session(
        &self,
        new: &NewSession<'_>,
        mut draw_token: impl FnMut() -> String,
    ) -> Result<ProvisionedSession> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing = match new.external_id {
                Some(ext) => query_active_by_external_id(&tx, ext)?,
                None => None,
            };
            let (session_id, reused) = match existing {
                Some(row) => (row.id, true),
                None => (
                    insert_session(
                        &tx,
                        new.external_id,
                        new.group_id,
                        new.title,
                        new.description,
                        new.ttl_hours,
                    )?,
                    false,
                ),
            };

            let host_token = ensure_token(&tx, session_id, Role::Host, new.ttl_hours, &mut draw_token)?;
            let user_token = ensure_token(&tx, session_id, Role::Participant, new.ttl_hours, &mut draw_token)?;

            let session = query_session(&tx, session_id)?
                .ok_or_else(|| anyhow::anyhow!("session {} vanished after insert", session_id))?;
            tx.commit()?;

            Ok(ProvisionedSession {
                session,
                host_token,
                user_token,
                reused,
            })
        })
    }
}

fn ensure_token(
    conn: &Connection,
    session_id: i64,
    role: Role,
    ttl_hours: i64,
    draw_token: &mut impl FnMut() -> String,
) -> Result<String> {
    if let Some(row) = query_active_token(conn, session_id, role)? {
        return Ok(row.token);
    }

    for _ in 0..MAX_TOKEN_DRAWS {
        let token = draw_token();
        if insert_token(conn, &token, session_id, role, ttl_hours)? {
            return Ok(token);
        }
        warn!("Token collision for session {}, retrying", session_id);
    }
    anyhow::bail!("could not issue a unique token after {} attempts", MAX_TOKEN_DRAWS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("TKN{:05}", n)
        }
    }

    #[test]
    fn new_session_gets_one_token_per_role() {
        let db = Database::open_in_memory().unwrap();
        let new = NewSession {
            title: "Tafsir",
            ttl_hours: 24,
            ..Default::default()
        };

        let out = db.provision_session(&new, counter()).unwrap();
        assert!(!out.reused);
        assert_ne!(out.host_token, out.user_token);
        assert_eq!(db.get_token(&out.host_token).unwrap().unwrap().role, "host");
        assert_eq!(db.get_token(&out.user_token).unwrap().unwrap().role, "participant");
    }

    #[test]
    fn same_external_id_converges_on_one_session() {
        let db = Database::open_in_memory().unwrap();
        let new = NewSession {
            external_id: Some(212),
            title: "Tafsir",
            ttl_hours: 24,
            ..Default::default()
        };

        let first = db.provision_session(&new, counter()).unwrap();
        let second = db
            .provision_session(&new, || -> String { unreachable!("live tokens are reused") })
            .unwrap();

        assert!(second.reused);
        assert_eq!(first.session.id, second.session.id);
        assert_eq!(first.host_token, second.host_token);
        assert_eq!(first.user_token, second.user_token);
    }

    #[test]
    fn collisions_are_retried_then_reported() {
        let db = Database::open_in_memory().unwrap();
        let new = NewSession {
            title: "Tafsir",
            ttl_hours: 24,
            ..Default::default()
        };
        let first = db.provision_session(&new, counter()).unwrap();

        // Replays the taken tokens before yielding fresh ones
        let mut replay = vec![first.host_token.clone(), first.user_token.clone()].into_iter();
        let mut fresh = counter();
        for _ in 0..2 {
            fresh();
        }
        let second = db
            .provision_session(&new, move || replay.next().unwrap_or_else(&mut fresh))
            .unwrap();
        assert_ne!(second.session.id, first.session.id);
        assert_ne!(second.host_token, first.host_token);

        let stuck = db.provision_session(&new, || first.host_token.clone());
        assert!(stuck.is_err());
    }
}
