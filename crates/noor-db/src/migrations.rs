use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE sessions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id     INTEGER,
                group_id        INTEGER,
                title           TEXT NOT NULL,
                description     TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                started_at      TEXT,
                ended_at        TEXT,
                expires_at      TEXT NOT NULL
            );

            CREATE INDEX idx_sessions_external ON sessions(external_id);

            CREATE TABLE session_tokens (
                token            TEXT PRIMARY KEY,
                session_id       INTEGER NOT NULL REFERENCES sessions(id),
                role             TEXT NOT NULL CHECK (role IN ('host', 'participant')),
                created_at       TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at       TEXT NOT NULL,
                is_active        INTEGER NOT NULL DEFAULT 1,
                access_count     INTEGER NOT NULL DEFAULT 0,
                last_accessed_at TEXT
            );

            CREATE INDEX idx_tokens_session ON session_tokens(session_id, role);

            CREATE TABLE users (
                user_id     TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT,
                country     TEXT,
                city        TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                modified_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE registrations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  INTEGER NOT NULL REFERENCES sessions(id),
                user_id     TEXT NOT NULL REFERENCES users(user_id),
                joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(session_id, user_id)
            );

            CREATE TABLE questions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  INTEGER NOT NULL REFERENCES sessions(id),
                user_id     TEXT NOT NULL REFERENCES users(user_id),
                text        TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'queued',
                vote_count  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_questions_session ON questions(session_id, id);

            CREATE TABLE question_answers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES questions(id),
                text        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_answers_question ON question_answers(question_id);

            CREATE TABLE question_votes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES questions(id),
                user_id     TEXT NOT NULL REFERENCES users(user_id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(question_id, user_id)
            );

            CREATE TABLE shared_assets (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                share_id    TEXT NOT NULL UNIQUE,
                session_id  INTEGER NOT NULL REFERENCES sessions(id),
                asset_type  TEXT NOT NULL,
                selector    TEXT,
                content     TEXT,
                metadata    TEXT,
                is_deleted  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_assets_session ON shared_assets(session_id, id);

            CREATE TABLE annotations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  INTEGER NOT NULL REFERENCES sessions(id),
                created_by  TEXT NOT NULL,
                data        TEXT NOT NULL,
                is_deleted  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_annotations_session ON annotations(session_id, id);

            CREATE TABLE content_broadcasts (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   INTEGER NOT NULL REFERENCES sessions(id),
                content_type TEXT NOT NULL,
                content      TEXT NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_broadcasts_session ON content_broadcasts(session_id, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
