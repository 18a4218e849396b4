//! SQL schema for the Lectern SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// All timestamp columns are 64-bit epoch milliseconds.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS sessions (
    session_id     TEXT PRIMARY KEY,
    session_code   TEXT NOT NULL,
    class_name     TEXT NOT NULL,
    moderator_id   TEXT NOT NULL,
    status         TEXT NOT NULL,      -- 'active' | 'closed' | 'archived'
    created_at     INTEGER NOT NULL,
    last_active_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_code_status_idx ON sessions(session_code, status);
CREATE INDEX IF NOT EXISTS sessions_status_idle_idx ON sessions(status, last_active_at);

CREATE TABLE IF NOT EXISTS questions (
    question_id  TEXT PRIMARY KEY,
    session_code TEXT NOT NULL,
    author_id    TEXT NOT NULL,
    text         TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    status       TEXT NOT NULL         -- 'unanswered' | 'answered'
);

CREATE INDEX IF NOT EXISTS questions_session_idx ON questions(session_code, created_at DESC);
CREATE INDEX IF NOT EXISTS questions_author_idx  ON questions(author_id, session_code);

-- Author-indexed secondary records; text/status are denormalized copies
-- kept consistent by the question ledger.
CREATE TABLE IF NOT EXISTS question_links (
    question_id  TEXT PRIMARY KEY,
    author_id    TEXT NOT NULL,
    session_code TEXT NOT NULL,
    text         TEXT NOT NULL,
    status       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS question_links_author_idx ON question_links(author_id, session_code);

CREATE TABLE IF NOT EXISTS active_questions (
    question_id  TEXT PRIMARY KEY,
    session_code TEXT NOT NULL,
    text         TEXT NOT NULL,
    created_at   INTEGER NOT NULL,
    active       INTEGER NOT NULL      -- 0 | 1
);

CREATE INDEX IF NOT EXISTS active_questions_live_idx
    ON active_questions(session_code, active, created_at DESC);

-- No UNIQUE over (active_question_id, student_id): one answer per student
-- is enforced by the collector's upsert, not by the store.
CREATE TABLE IF NOT EXISTS answers (
    answer_id          TEXT PRIMARY KEY,
    active_question_id TEXT NOT NULL,
    session_code       TEXT NOT NULL,
    student_id         TEXT NOT NULL,
    text               TEXT NOT NULL,
    created_at         INTEGER NOT NULL,
    updated            INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS answers_question_idx ON answers(active_question_id, created_at);
CREATE INDEX IF NOT EXISTS answers_student_idx  ON answers(active_question_id, student_id);
CREATE INDEX IF NOT EXISTS answers_session_idx  ON answers(session_code);

CREATE TABLE IF NOT EXISTS points (
    student_id   TEXT PRIMARY KEY,
    total        INTEGER NOT NULL,
    last_updated INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS joined_class_links (
    student_id   TEXT PRIMARY KEY,
    session_code TEXT NOT NULL,
    class_name   TEXT NOT NULL,
    joined_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS joined_links_session_idx ON joined_class_links(session_code);

PRAGMA user_version = 1;
";
