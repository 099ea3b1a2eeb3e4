//! Error types for lesson-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while turning feed entries into lessons.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("entry {entry}: missing field {field}")]
    MissingField { entry: usize, field: &'static str },

    #[error("entry {entry}: invalid day '{value}'")]
    InvalidDay { entry: usize, value: String },

    #[error("entry {entry}: correct answer '{value}' is not an option number between 1 and 4")]
    InvalidCorrectAnswer { entry: usize, value: String },

    #[error("malformed feed: {0}")]
    MalformedFeed(String),
}
