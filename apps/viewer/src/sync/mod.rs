//! Lesson synchronization between the remote feed and the local cache.

pub mod fetcher;
pub mod service;

pub use fetcher::{FeedQuery, Fetcher, HttpFetcher};
pub use service::LessonSyncService;

/// Feed errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Feed returned no lessons")]
    Empty,
}

impl From<lesson_core::ParseError> for FeedError {
    fn from(e: lesson_core::ParseError) -> Self {
        Self::Parse(e.to_string())
    }
}
