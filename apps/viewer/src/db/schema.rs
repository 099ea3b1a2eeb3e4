//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local lesson cache.
pub const SCHEMA: &str = r#"
-- Lesson content (cached from the feed or seeded from bundled lessons)
CREATE TABLE IF NOT EXISTS lessons (
    day INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    tip_title TEXT NOT NULL,
    tip_description TEXT NOT NULL,
    quiz_question TEXT NOT NULL,
    quiz_option1 TEXT NOT NULL,
    quiz_option2 TEXT NOT NULL,
    quiz_option3 TEXT NOT NULL,
    quiz_option4 TEXT NOT NULL,
    quiz_correct_answer INTEGER NOT NULL,
    quiz_explanation TEXT NOT NULL,
    quote_text TEXT NOT NULL,
    quote_author TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    cached_at TEXT NOT NULL
);

-- Completion state, owned locally and never part of the feed
CREATE TABLE IF NOT EXISTS lesson_completion (
    day INTEGER PRIMARY KEY,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT
);

-- Viewer session state (current day, ...)
CREATE TABLE IF NOT EXISTS session_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// Session key holding the day currently being viewed.
pub const CURRENT_DAY_KEY: &str = "current_day";
