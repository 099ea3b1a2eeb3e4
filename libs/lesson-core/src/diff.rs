//! Content comparison used to detect remote lesson updates.

use crate::types::{LessonRecord, QUIZ_OPTION_COUNT};
use serde::{Deserialize, Serialize};

/// A content field of a lesson. Completion state is not content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "field", content = "index")]
pub enum ContentField {
    Title,
    TipTitle,
    TipDescription,
    QuizQuestion,
    QuizOption(usize),
    QuizCorrectAnswer,
    QuizExplanation,
    QuoteText,
    QuoteAuthor,
}

/// List the content fields that differ between two versions of a lesson.
pub fn changed_fields(held: &LessonRecord, fetched: &LessonRecord) -> Vec<ContentField> {
    let mut changed = Vec::new();

    if held.title != fetched.title {
        changed.push(ContentField::Title);
    }
    if held.tip.title != fetched.tip.title {
        changed.push(ContentField::TipTitle);
    }
    if held.tip.description != fetched.tip.description {
        changed.push(ContentField::TipDescription);
    }
    if held.quiz.question != fetched.quiz.question {
        changed.push(ContentField::QuizQuestion);
    }
    for i in 0..QUIZ_OPTION_COUNT {
        if held.quiz.options[i] != fetched.quiz.options[i] {
            changed.push(ContentField::QuizOption(i));
        }
    }
    if held.quiz.correct_answer != fetched.quiz.correct_answer {
        changed.push(ContentField::QuizCorrectAnswer);
    }
    if held.quiz.explanation != fetched.quiz.explanation {
        changed.push(ContentField::QuizExplanation);
    }
    if held.quote.text != fetched.quote.text {
        changed.push(ContentField::QuoteText);
    }
    if held.quote.author != fetched.quote.author {
        changed.push(ContentField::QuoteAuthor);
    }

    changed
}

/// Whether any content field differs. A missing held lesson always counts as different.
pub fn is_content_different(held: Option<&LessonRecord>, fetched: &LessonRecord) -> bool {
    match held {
        Some(held) => !changed_fields(held, fetched).is_empty(),
        None => true,
    }
}
