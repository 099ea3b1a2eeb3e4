//! Core types for the lesson viewer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every quiz offers exactly this many answer options.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// The daily tip: a heading plus a rich-text (HTML) body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub title: String,
    pub description: String,
}

/// Multiple choice quiz attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub question: String,
    pub options: [String; QUIZ_OPTION_COUNT],
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
}

impl Quiz {
    /// Whether the selected option index is the right one.
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer
    }

    /// Text of the correct option.
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer.min(QUIZ_OPTION_COUNT - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// One calendar day's lesson content plus the learner's completion state.
///
/// `day` is the primary key and defines ordering. Completion state is owned
/// locally: the remote feed never carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub day: u32,
    pub title: String,
    pub tip: Tip,
    pub quiz: Quiz,
    pub quote: Quote,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<DateTime<Utc>>,
}

impl LessonRecord {
    /// Mark the lesson completed at `now`.
    ///
    /// The timestamp is only recorded on the first transition; completing an
    /// already completed lesson keeps the original time.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        if !self.completed {
            self.completed = true;
            self.completion_timestamp = Some(now);
        }
    }

    /// Reset completion state, clearing the timestamp with it.
    pub fn clear_completion(&mut self) {
        self.completed = false;
        self.completion_timestamp = None;
    }

    /// Replace this record's completion state. The lesson is completed
    /// exactly when a completion time is given.
    pub fn with_completion(mut self, completed_at: Option<DateTime<Utc>>) -> Self {
        self.completed = completed_at.is_some();
        self.completion_timestamp = completed_at;
        self
    }

    /// Copy completion fields from another record for the same day.
    pub fn preserve_completion_from(&mut self, held: &LessonRecord) {
        self.completed = held.completed;
        self.completion_timestamp = held.completion_timestamp;
    }

    /// Compare content fields only, ignoring completion.
    pub fn content_eq(&self, other: &LessonRecord) -> bool {
        self.title == other.title
            && self.tip == other.tip
            && self.quiz == other.quiz
            && self.quote == other.quote
    }
}

/// Sort by day and drop duplicate days, keeping the last occurrence.
pub fn normalize_lessons(mut lessons: Vec<LessonRecord>) -> Vec<LessonRecord> {
    lessons.reverse();
    lessons.sort_by_key(|l| l.day);
    lessons.dedup_by_key(|l| l.day);
    lessons
}


#[cfg(test)]
mod tests {
    use super::test_support::lesson;
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mark_completed_sets_timestamp_once() {
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let mut record = lesson(1);

        record.mark_completed(first);
        record.mark_completed(later);

        assert!(record.completed);
        assert_eq!(record.completion_timestamp, Some(first));
    }

    #[test]
    fn with_completion_follows_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let done = lesson(1).with_completion(Some(ts));
        assert!(done.completed);
        assert_eq!(done.completion_timestamp, Some(ts));

        let reset = done.with_completion(None);
        assert!(!reset.completed);
        assert_eq!(reset.completion_timestamp, None);
    }

    #[test]
    fn content_eq_ignores_completion() {
        let mut done = lesson(3);
        done.mark_completed(Utc::now());
        assert!(done.content_eq(&lesson(3)));
        assert_ne!(done, lesson(3));
    }

    #[test]
    fn normalize_sorts_and_keeps_last_duplicate() {
        let mut newer = lesson(2);
        newer.title = "Newer".to_string();
        let lessons = normalize_lessons(vec![lesson(3), lesson(2), lesson(1), newer]);

        let days: Vec<u32> = lessons.iter().map(|l| l.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(lessons[1].title, "Newer");
    }

    #[test]
    fn quiz_correct_option() {
        let record = lesson(1);
        assert!(record.quiz.is_correct(1));
        assert!(!record.quiz.is_correct(0));
        assert_eq!(record.quiz.correct_option(), "B");
    }

    #[test]
    fn deserializes_without_completion_fields() {
        let json = r#"{
            "day": 7,
            "title": "T",
            "tip": {"title": "tt", "description": "td"},
            "quiz": {"question": "q", "options": ["a", "b", "c", "d"], "correct_answer": 3, "explanation": "e"},
            "quote": {"text": "x", "author": "y"}
        }"#;
        let record: LessonRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.day, 7);
        assert!(!record.completed);
        assert_eq!(record.completion_timestamp, None);
        assert_eq!(record.quiz.correct_option(), "d");
    }
}
