//! Remote lesson feed payload and its conversion into lessons.
//!
//! # Format
//! ```json
//! {"feed": {"entry": [
//!   {"gsx$day": {"$t": "1"}, "gsx$title": {"$t": "First Impressions"}, ...}
//! ]}}
//! ```
//!
//! Each entry is a flat set of `gsx$<column>` fields wrapping their text in
//! `{"$t": ...}`. The quiz answer column is a 1-based option number.

use crate::error::{ParseError, Result};
use crate::types::{LessonRecord, Quiz, Quote, Tip, QUIZ_OPTION_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIELD_PREFIX: &str = "gsx$";
const TEXT_KEY: &str = "$t";

const OPTION_FIELDS: [&str; QUIZ_OPTION_COUNT] =
    ["quizoption1", "quizoption2", "quizoption3", "quizoption4"];

/// Top-level feed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedResponse {
    pub feed: Feed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub entry: Vec<FeedEntry>,
}

impl FeedResponse {
    /// Build a response around the given entries.
    pub fn new(entry: Vec<FeedEntry>) -> Self {
        Self {
            feed: Feed { entry },
        }
    }

    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| ParseError::MalformedFeed(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.feed.entry.is_empty()
    }
}

/// A single spreadsheet row as delivered by the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedEntry(pub Map<String, Value>);

impl FeedEntry {
    /// Text value of a column, if present.
    pub fn text(&self, column: &str) -> Option<String> {
        let cell = self.0.get(&format!("{}{}", FIELD_PREFIX, column))?;
        match cell.get(TEXT_KEY)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Set a column's text value.
    pub fn set_text(&mut self, column: &str, value: impl Into<String>) {
        let mut cell = Map::new();
        cell.insert(TEXT_KEY.to_string(), Value::String(value.into()));
        self.0
            .insert(format!("{}{}", FIELD_PREFIX, column), Value::Object(cell));
    }

    /// Encode a lesson as a feed row. Completion state is not part of the feed.
    pub fn from_lesson(lesson: &LessonRecord) -> Self {
        let mut entry = Self::default();
        entry.set_text("day", lesson.day.to_string());
        entry.set_text("title", lesson.title.clone());
        entry.set_text("tiptitle", lesson.tip.title.clone());
        entry.set_text("tipdescription", lesson.tip.description.clone());
        entry.set_text("quizquestion", lesson.quiz.question.clone());
        for (column, option) in OPTION_FIELDS.iter().zip(lesson.quiz.options.iter()) {
            entry.set_text(column, option.clone());
        }
        entry.set_text("correctanswer", (lesson.quiz.correct_answer + 1).to_string());
        entry.set_text("quizexplanation", lesson.quiz.explanation.clone());
        entry.set_text("quotetext", lesson.quote.text.clone());
        entry.set_text("quoteauthor", lesson.quote.author.clone());
        entry
    }

    fn required(&self, index: usize, column: &'static str) -> Result<String> {
        self.text(column).ok_or(ParseError::MissingField {
            entry: index,
            field: column,
        })
    }
}

/// Parse every entry of a feed response.
///
/// One malformed entry fails the whole batch.
pub fn parse_entries(response: &FeedResponse) -> Result<Vec<LessonRecord>> {
    response
        .feed
        .entry
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

/// Parse a single feed entry into a lesson with default completion state.
pub fn parse_entry(index: usize, entry: &FeedEntry) -> Result<LessonRecord> {
    let day_raw = entry.required(index, "day")?;
    let day = day_raw
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| ParseError::InvalidDay {
            entry: index,
            value: day_raw.clone(),
        })?;

    let answer_raw = entry.required(index, "correctanswer")?;
    let correct_answer = answer_raw
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=QUIZ_OPTION_COUNT).contains(n))
        .map(|n| n - 1)
        .ok_or_else(|| ParseError::InvalidCorrectAnswer {
            entry: index,
            value: answer_raw.clone(),
        })?;

    Ok(LessonRecord {
        day,
        title: entry.required(index, "title")?,
        tip: Tip {
            title: entry.required(index, "tiptitle")?,
            description: entry.required(index, "tipdescription")?,
        },
        quiz: Quiz {
            question: entry.required(index, "quizquestion")?,
            options: [
                entry.required(index, OPTION_FIELDS[0])?,
                entry.required(index, OPTION_FIELDS[1])?,
                entry.required(index, OPTION_FIELDS[2])?,
                entry.required(index, OPTION_FIELDS[3])?,
            ],
            correct_answer,
            explanation: entry.required(index, "quizexplanation")?,
        },
        quote: Quote {
            text: entry.required(index, "quotetext")?,
            author: entry.required(index, "quoteauthor")?,
        },
        completed: false,
        completion_timestamp: None,
    })
}
