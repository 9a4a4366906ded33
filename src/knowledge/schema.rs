//! Database schema for the knowledge and session stores.
//!
//! Knowledge tables:
//! - triangles, answer_options, theorems, questions: reference entities
//! - question_prerequisites, theorem_triangles, theorem_questions: associations
//! - initial_multipliers / dynamic_multipliers: the two multiplier tiers
//! - theorem_scores, theorem_helpfulness: calibration outputs
//!
//! Session tables:
//! - sessions: finished interaction logs as JSON

use tracing::info;

pub const KNOWLEDGE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS triangles (
    triangle_id INTEGER PRIMARY KEY,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS answer_options (
    answer_id INTEGER PRIMARY KEY,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS theorems (
    theorem_id INTEGER PRIMARY KEY,
    theorem_text TEXT NOT NULL,
    category INTEGER,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS questions (
    question_id INTEGER PRIMARY KEY,
    question_text TEXT NOT NULL,
    difficulty_level INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    related_theorem INTEGER
);

CREATE TABLE IF NOT EXISTS question_prerequisites (
    dependent_question_id INTEGER NOT NULL,
    prerequisite_question_id INTEGER NOT NULL,
    PRIMARY KEY (dependent_question_id, prerequisite_question_id)
);

CREATE TABLE IF NOT EXISTS theorem_triangles (
    theorem_id INTEGER NOT NULL,
    triangle_id INTEGER NOT NULL,
    connection_strength REAL NOT NULL
        CHECK (connection_strength >= 0 AND connection_strength <= 1),
    PRIMARY KEY (theorem_id, triangle_id)
);

CREATE TABLE IF NOT EXISTS theorem_questions (
    theorem_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    PRIMARY KEY (theorem_id, question_id)
);

CREATE TABLE IF NOT EXISTS initial_multipliers (
    question_id INTEGER NOT NULL,
    answer_id INTEGER NOT NULL,
    triangle_id INTEGER NOT NULL,
    multiplier REAL NOT NULL,
    PRIMARY KEY (question_id, answer_id, triangle_id)
);

CREATE TABLE IF NOT EXISTS dynamic_multipliers (
    question_id INTEGER NOT NULL,
    answer_id INTEGER NOT NULL,
    triangle_id INTEGER NOT NULL,
    multiplier REAL NOT NULL,
    session_count_total INTEGER NOT NULL DEFAULT 0,
    session_count_with_triangle INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (question_id, answer_id, triangle_id)
);

CREATE TABLE IF NOT EXISTS theorem_scores (
    question_id INTEGER NOT NULL,
    answer_id INTEGER NOT NULL,
    theorem_id INTEGER NOT NULL,
    count_total INTEGER NOT NULL DEFAULT 0,
    count_helpful INTEGER NOT NULL DEFAULT 0,
    score REAL NOT NULL,
    PRIMARY KEY (question_id, answer_id, theorem_id)
);

CREATE TABLE IF NOT EXISTS theorem_helpfulness (
    theorem_id INTEGER PRIMARY KEY,
    helpful_session_count INTEGER NOT NULL DEFAULT 0,
    general_helpfulness REAL NOT NULL DEFAULT 0
);
"#;

pub const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    feedback INTEGER,
    data TEXT NOT NULL,
    ended_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_feedback ON sessions(feedback);
"#;

/// Create knowledge tables. Safe to call multiple times.
pub fn init_knowledge_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(KNOWLEDGE_SCHEMA)?;
    info!("Knowledge database schema initialized");
    Ok(())
}

/// Create session tables. Safe to call multiple times.
pub fn init_session_tables(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SESSION_SCHEMA)?;
    info!("Session database schema initialized");
    Ok(())
}
