use anyhow::Result;
use rusqlite::Row;

use noor_types::models::QuestionStatus;

use super::OptionalExt;
use crate::Database;
use crate::models::{AnswerRow, QuestionRow};

/// Result of a vote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; carries the new total.
    Counted(i64),
    /// This user already voted on the question.
    Duplicate,
}

// JOIN users to fetch the author name in the same query
const QUESTION_SELECT: &str = "SELECT q.id, q.session_id, q.user_id, u.name, q.text, q.status, q.vote_count,
        q.created_at, q.updated_at
     FROM questions q
     LEFT JOIN users u ON q.user_id = u.user_id";

impl Database {
    pub fn insert_question(&self, session_id: i64, user_id: &str, text: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO questions (session_id, user_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![session_id, user_id, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_question(&self, id: i64) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE q.id = ?1", QUESTION_SELECT);
            conn.query_row(&sql, [id], map_question).optional()
        })
    }

    /// Questions of a session in submission order.
    pub fn list_questions(&self, session_id: i64, include_hidden: bool) -> Result<Vec<QuestionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE q.session_id = ?1 AND (?2 OR q.status != 'hidden') ORDER BY q.id",
                QUESTION_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![session_id, include_hidden], map_question)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_question_status(&self, id: i64, status: QuestionStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE questions SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![id, status.as_str()],
            )?;
            Ok(changed == 1)
        })
    }

    /// Append an answer and move the question to `answered` in one transaction.
    pub fn add_answer(&self, question_id: i64, text: &str) -> Result<AnswerRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO question_answers (question_id, text) VALUES (?1, ?2)",
                rusqlite::params![question_id, text],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE questions SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                rusqlite::params![question_id, QuestionStatus::Answered.as_str()],
            )?;
            let row = tx.query_row(
                "SELECT id, question_id, text, created_at FROM question_answers WHERE id = ?1",
                [id],
                map_answer,
            )?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Batch-fetch answers for a set of question IDs.
    pub fn get_answers_for_questions(&self, question_ids: &[i64]) -> Result<Vec<AnswerRow>> {
        if question_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=question_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, question_id, text, created_at FROM question_answers
                 WHERE question_id IN ({}) ORDER BY id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(question_ids.iter()), map_answer)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Record one vote per (question, user) and bump the counter atomically.
    pub fn add_vote(&self, question_id: i64, user_id: &str) -> Result<VoteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO question_votes (question_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![question_id, user_id],
            )?;
            if inserted == 0 {
                return Ok(VoteOutcome::Duplicate);
            }

            tx.execute(
                "UPDATE questions SET vote_count = vote_count + 1, updated_at = datetime('now') WHERE id = ?1",
                [question_id],
            )?;
            let count: i64 =
                tx.query_row("SELECT vote_count FROM questions WHERE id = ?1", [question_id], |r| r.get(0))?;
            tx.commit()?;
            Ok(VoteOutcome::Counted(count))
        })
    }
}

fn map_question(row: &Row<'_>) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        text: row.get(4)?,
        status: row.get(5)?,
        vote_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_answer(row: &Row<'_>) -> rusqlite::Result<AnswerRow> {
    Ok(AnswerRow {
        id: row.get(0)?,
        question_id: row.get(1)?,
        text: row.get(2)?,
        created_at: row.get(3)?,
    })
}
