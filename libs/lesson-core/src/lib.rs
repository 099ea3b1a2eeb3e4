//! Core lesson library shared by the viewer application.
//!
//! Provides:
//! - Lesson types (LessonRecord, Tip, Quiz, Quote)
//! - Remote feed entry parsing
//! - Content comparison for change detection
//! - The 24-hour unlock rule
//! - The bundled fallback lessons

pub mod diff;
pub mod error;
pub mod fallback;
pub mod feed;
pub mod types;
pub mod unlock;

pub use diff::{changed_fields, is_content_different, ContentField};
pub use error::{ParseError, Result};
pub use feed::{parse_entries, parse_entry, FeedEntry, FeedResponse};
pub use types::{normalize_lessons, LessonRecord, Quiz, Quote, Tip, QUIZ_OPTION_COUNT};
pub use unlock::{time_remaining, UnlockStatus, DEFAULT_UNLOCK_WINDOW_HOURS};
