//! Repository pattern for lesson cache access.

use crate::db::error::StoreError;
use crate::db::schema::{CURRENT_DAY_KEY, SCHEMA, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use lesson_core::{LessonRecord, Quiz, Quote, Tip};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

type Result<T> = std::result::Result<T, StoreError>;

/// Repository for cached lesson content.
pub trait LessonRepository {
    fn get_lesson(&self, day: u32) -> Result<Option<LessonRecord>>;
    fn get_lessons(&self, start_day: u32, end_day: u32) -> Result<Vec<LessonRecord>>;
    fn store_lesson(&self, lesson: &LessonRecord) -> Result<usize>;
    fn store_lessons(&self, lessons: &[LessonRecord]) -> Result<usize>;
    fn seed_lessons(&self, lessons: &[LessonRecord]) -> Result<usize>;
    fn export_lessons(&self) -> Result<String>;
}

/// Repository for per-day completion state.
pub trait CompletionRepository {
    fn is_lesson_completed(&self, day: u32) -> Result<bool>;
    fn get_lesson_completion_timestamp(&self, day: u32) -> Result<Option<DateTime<Utc>>>;
    fn update_lesson_completion(
        &self,
        day: u32,
        completed: bool,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Repository for viewer navigation state.
pub trait SessionRepository {
    fn get_current_day(&self) -> Result<Option<u32>>;
    fn set_current_day(&self, day: u32) -> Result<()>;
}

/// SQLite implementation of the lesson repositories.
pub struct SqliteLessonStore {
    conn: Connection,
}

const LESSON_COLUMNS: &str = "l.day, l.title, l.tip_title, l.tip_description, l.quiz_question,
    l.quiz_option1, l.quiz_option2, l.quiz_option3, l.quiz_option4, l.quiz_correct_answer,
    l.quiz_explanation, l.quote_text, l.quote_author, c.completed, c.completed_at";

impl SqliteLessonStore {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Highest applied schema version.
    pub fn schema_version(&self) -> Result<i32> {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Number of days with cached content.
    pub fn count_lessons(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lessons", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn all_lessons(&self) -> Result<Vec<LessonRecord>> {
        let sql = format!(
            "SELECT {} FROM lessons l LEFT JOIN lesson_completion c ON c.day = l.day ORDER BY l.day",
            LESSON_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let lessons = stmt
            .query_map([], Self::row_to_lesson)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lessons)
    }

    fn upsert_lesson(&self, lesson: &LessonRecord, cached_at: &str) -> Result<usize> {
        let changed = self.conn.execute(
            "INSERT INTO lessons (day, title, tip_title, tip_description, quiz_question,
                quiz_option1, quiz_option2, quiz_option3, quiz_option4, quiz_correct_answer,
                quiz_explanation, quote_text, quote_author, content_hash, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(day) DO UPDATE SET
                title = excluded.title,
                tip_title = excluded.tip_title,
                tip_description = excluded.tip_description,
                quiz_question = excluded.quiz_question,
                quiz_option1 = excluded.quiz_option1,
                quiz_option2 = excluded.quiz_option2,
                quiz_option3 = excluded.quiz_option3,
                quiz_option4 = excluded.quiz_option4,
                quiz_correct_answer = excluded.quiz_correct_answer,
                quiz_explanation = excluded.quiz_explanation,
                quote_text = excluded.quote_text,
                quote_author = excluded.quote_author,
                content_hash = excluded.content_hash,
                cached_at = excluded.cached_at
             WHERE lessons.content_hash != excluded.content_hash",
            params![
                lesson.day,
                lesson.title,
                lesson.tip.title,
                lesson.tip.description,
                lesson.quiz.question,
                lesson.quiz.options[0],
                lesson.quiz.options[1],
                lesson.quiz.options[2],
                lesson.quiz.options[3],
                lesson.quiz.correct_answer as i64,
                lesson.quiz.explanation,
                lesson.quote.text,
                lesson.quote.author,
                content_hash(lesson),
                cached_at,
            ],
        )?;
        Ok(changed)
    }

    /// Completion time of a completed day. Missing or unreadable text is an error.
    fn completion_time(completed_at: Option<String>) -> rusqlite::Result<DateTime<Utc>> {
        let text = completed_at.ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(14, "completed_at".to_string(), Type::Null)
        })?;
        parse_timestamp(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))
    }

    fn row_to_lesson(row: &rusqlite::Row) -> rusqlite::Result<LessonRecord> {
        let correct_answer: i64 = row.get(9)?;
        let completed: Option<bool> = row.get(13)?;
        let completed_at: Option<String> = row.get(14)?;
        let completed = completed.unwrap_or(false);

        Ok(LessonRecord {
            day: row.get(0)?,
            title: row.get(1)?,
            tip: Tip {
                title: row.get(2)?,
                description: row.get(3)?,
            },
            quiz: Quiz {
                question: row.get(4)?,
                options: [row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?],
                correct_answer: correct_answer as usize,
                explanation: row.get(10)?,
            },
            quote: Quote {
                text: row.get(11)?,
                author: row.get(12)?,
            },
            completed,
            completion_timestamp: if completed {
                Some(Self::completion_time(completed_at)?)
            } else {
                None
            },
        })
    }
}

impl LessonRepository for SqliteLessonStore {
    fn get_lesson(&self, day: u32) -> Result<Option<LessonRecord>> {
        let sql = format!(
            "SELECT {} FROM lessons l LEFT JOIN lesson_completion c ON c.day = l.day WHERE l.day = ?1",
            LESSON_COLUMNS
        );
        self.conn
            .query_row(&sql, params![day], Self::row_to_lesson)
            .optional()
            .map_err(Into::into)
    }

    fn get_lessons(&self, start_day: u32, end_day: u32) -> Result<Vec<LessonRecord>> {
        let sql = format!(
            "SELECT {} FROM lessons l LEFT JOIN lesson_completion c ON c.day = l.day
             WHERE l.day >= ?1 AND l.day <= ?2
             ORDER BY l.day",
            LESSON_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let lessons = stmt
            .query_map(params![start_day, end_day], Self::row_to_lesson)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lessons)
    }

    fn store_lesson(&self, lesson: &LessonRecord) -> Result<usize> {
        self.store_lessons(std::slice::from_ref(lesson))
    }

    fn store_lessons(&self, lessons: &[LessonRecord]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut changed = 0;
        for lesson in lessons {
            changed += self.upsert_lesson(lesson, &now)?;
        }
        Ok(changed)
    }

    fn seed_lessons(&self, lessons: &[LessonRecord]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for lesson in lessons {
            let exists: Option<i64> = self
                .conn
                .query_row(
                    "SELECT day FROM lessons WHERE day = ?1",
                    params![lesson.day],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                inserted += self.upsert_lesson(lesson, &now)?;
            }
        }
        Ok(inserted)
    }

    fn export_lessons(&self) -> Result<String> {
        let lessons = self.all_lessons()?;
        Ok(serde_json::to_string(&lessons)?)
    }
}

impl CompletionRepository for SqliteLessonStore {
    fn is_lesson_completed(&self, day: u32) -> Result<bool> {
        let completed: Option<bool> = self
            .conn
            .query_row(
                "SELECT completed FROM lesson_completion WHERE day = ?1",
                params![day],
                |row| row.get(0),
            )
            .optional()?;
        Ok(completed.unwrap_or(false))
    }

    fn get_lesson_completion_timestamp(&self, day: u32) -> Result<Option<DateTime<Utc>>> {
        let completed_at: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT completed_at FROM lesson_completion WHERE day = ?1 AND completed = 1",
                params![day],
                |row| row.get(0),
            )
            .optional()?;
        match completed_at {
            None => Ok(None),
            Some(None) => Err(StoreError::InvalidData(format!(
                "day {} is completed without a completion time",
                day
            ))),
            Some(Some(text)) => parse_timestamp(&text).map(Some).map_err(|_| {
                StoreError::InvalidData(format!("completion time '{}' for day {}", text, day))
            }),
        }
    }

    fn update_lesson_completion(
        &self,
        day: u32,
        completed: bool,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if completed {
            let completed_at = timestamp.unwrap_or_else(Utc::now).to_rfc3339();
            // An already completed day keeps its first completion time.
            self.conn.execute(
                "INSERT INTO lesson_completion (day, completed, completed_at) VALUES (?1, 1, ?2)
                 ON CONFLICT(day) DO UPDATE SET
                    completed = 1,
                    completed_at = CASE WHEN lesson_completion.completed = 1
                        THEN COALESCE(lesson_completion.completed_at, excluded.completed_at)
                        ELSE excluded.completed_at END",
                params![day, completed_at],
            )?;
        } else {
            self.conn.execute(
                "INSERT INTO lesson_completion (day, completed, completed_at) VALUES (?1, 0, NULL)
                 ON CONFLICT(day) DO UPDATE SET completed = 0, completed_at = NULL",
                params![day],
            )?;
        }
        Ok(())
    }
}

impl SessionRepository for SqliteLessonStore {
    fn get_current_day(&self) -> Result<Option<u32>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![CURRENT_DAY_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(v) => v
                .parse::<u32>()
                .map(Some)
                .map_err(|_| StoreError::InvalidData(format!("current day '{}'", v))),
            None => Ok(None),
        }
    }

    fn set_current_day(&self, day: u32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![CURRENT_DAY_KEY, day.to_string()],
        )?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// SHA-256 fingerprint of a lesson's content fields.
pub fn content_hash(lesson: &LessonRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(lesson.title.as_bytes());
    for part in [
        &lesson.tip.title,
        &lesson.tip.description,
        &lesson.quiz.question,
        &lesson.quiz.options[0],
        &lesson.quiz.options[1],
        &lesson.quiz.options[2],
        &lesson.quiz.options[3],
        &lesson.quiz.explanation,
        &lesson.quote.text,
        &lesson.quote.author,
    ] {
        hasher.update([0u8]);
        hasher.update(part.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update((lesson.quiz.correct_answer as u32).to_le_bytes());
    format!("{:x}", hasher.finalize())
}
