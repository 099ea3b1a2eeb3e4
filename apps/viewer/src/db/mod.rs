//! Local SQLite lesson cache.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::StoreError;
pub use repository::{
    content_hash, CompletionRepository, LessonRepository, SessionRepository, SqliteLessonStore,
};
