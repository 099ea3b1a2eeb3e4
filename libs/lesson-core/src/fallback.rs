//! Lessons bundled with the application, served when the feed is unavailable.

use crate::types::LessonRecord;
use std::sync::OnceLock;

const FALLBACK_JSON: &str = include_str!("../data/fallback_lessons.json");

static FALLBACK: OnceLock<Vec<LessonRecord>> = OnceLock::new();

/// All bundled lessons, ordered by day.
pub fn lessons() -> &'static [LessonRecord] {
    FALLBACK.get_or_init(|| {
        let mut lessons: Vec<LessonRecord> =
            serde_json::from_str(FALLBACK_JSON).unwrap_or_default();
        lessons.sort_by_key(|l| l.day);
        lessons
    })
}

/// Bundled lesson for a single day.
pub fn lesson(day: u32) -> Option<LessonRecord> {
    lessons().iter().find(|l| l.day == day).cloned()
}

/// Bundled lessons within an inclusive day range.
pub fn lessons_in_range(start_day: u32, end_day: u32) -> Vec<LessonRecord> {
    lessons()
        .iter()
        .filter(|l| l.day >= start_day && l.day <= end_day)
        .cloned()
        .collect()
}
