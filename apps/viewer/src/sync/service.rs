//! Cache-first lesson service.
//!
//! Serves lessons from the local store when it has them, falls back to the
//! remote feed otherwise, and finally to the bundled lessons when the feed
//! is unreachable, malformed or empty. Completion state always comes from
//! the local store; the feed never carries it.

use chrono::{DateTime, Utc};
use lesson_core::{
    changed_fields, fallback, is_content_different, normalize_lessons, parse_entries,
    LessonRecord,
};
use std::sync::{Arc, Mutex, MutexGuard};

use super::fetcher::{FeedQuery, Fetcher};
use super::FeedError;
use crate::db::{
    CompletionRepository, LessonRepository, SessionRepository, SqliteLessonStore, StoreError,
};

struct LessonSyncServiceInner {
    store: Arc<Mutex<SqliteLessonStore>>,
    fetcher: Arc<dyn Fetcher>,
}

/// Single source of truth for the lessons a learner sees.
///
/// Clone-able; all state lives behind an Arc so background tasks can hold
/// their own handle. The store lock is only taken for synchronous calls and
/// never held across an await point.
#[derive(Clone)]
pub struct LessonSyncService {
    inner: Arc<LessonSyncServiceInner>,
}

impl LessonSyncService {
    pub fn new(store: Arc<Mutex<SqliteLessonStore>>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            inner: Arc::new(LessonSyncServiceInner { store, fetcher }),
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<Mutex<SqliteLessonStore>> {
        self.inner.store.clone()
    }

    /// Lessons for days `1..=current_day`.
    ///
    /// The cache is used only when it holds every day of the range; a single
    /// missing day refetches the whole range.
    pub async fn get_initial_lessons(&self, current_day: u32) -> Vec<LessonRecord> {
        match self.with_store(|s| s.get_lessons(1, current_day)) {
            Ok(cached) if cached.len() == current_day as usize => {
                tracing::debug!("Serving days 1-{} from cache", current_day);
                return cached;
            }
            Ok(cached) => tracing::debug!(
                "Cache holds {} of {} days, fetching the full range",
                cached.len(),
                current_day
            ),
            Err(e) => tracing::warn!("Cache read failed, treating as miss: {}", e),
        }

        self.fetch_lessons(1, current_day).await
    }

    /// Lesson for a single day, cache first.
    pub async fn get_lesson_by_day(&self, day: u32) -> Option<LessonRecord> {
        match self.with_store(|s| s.get_lesson(day)) {
            Ok(Some(lesson)) => return Some(lesson),
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read for day {} failed, treating as miss: {}", day, e),
        }

        self.fetch_lesson(day).await
    }

    /// Fetch a day range from the feed and cache it.
    ///
    /// Falls back to the bundled lessons for the range on any fetch failure.
    pub async fn fetch_lessons(&self, start_day: u32, end_day: u32) -> Vec<LessonRecord> {
        let query = FeedQuery::Range {
            start: start_day,
            end: end_day,
        };

        match self.fetch_remote(&query).await {
            Ok(lessons) => {
                let lessons = self.merge_completion(lessons);
                self.cache_lessons(&lessons);
                lessons
            }
            Err(e) => {
                tracing::warn!(
                    "Error fetching lessons {}-{}, using bundled lessons: {}",
                    start_day,
                    end_day,
                    e
                );
                self.merge_completion(fallback::lessons_in_range(start_day, end_day))
            }
        }
    }

    /// Fetch a single day from the feed and cache it.
    pub async fn fetch_lesson(&self, day: u32) -> Option<LessonRecord> {
        match self.fetch_remote(&FeedQuery::Day(day)).await {
            Ok(lessons) => {
                let lessons = self.merge_completion(lessons);
                self.cache_lessons(&lessons);
                let position = lessons.iter().position(|l| l.day == day).unwrap_or(0);
                lessons.into_iter().nth(position)
            }
            Err(e) => {
                tracing::warn!("Error fetching lesson {}, using bundled lesson: {}", day, e);
                fallback::lesson(day).and_then(|l| self.merge_completion(vec![l]).pop())
            }
        }
    }

    /// Refetch the held lessons and persist any whose content changed.
    ///
    /// Only days present in `current_lessons` are compared, so gaps in the
    /// held set never count as changes. Completion state of the held lessons
    /// is carried over onto the refreshed content. Returns whether anything
    /// changed; fetch failures count as "no updates".
    pub async fn check_for_updates(&self, current_lessons: &[LessonRecord]) -> bool {
        let days = current_lessons.iter().map(|l| l.day);
        let (Some(start), Some(end)) = (days.clone().min(), days.max()) else {
            return false;
        };

        let fetched = match self.fetch_remote(&FeedQuery::Range { start, end }).await {
            Ok(lessons) => lessons,
            Err(e) => {
                tracing::warn!("Error checking for updates: {}", e);
                return false;
            }
        };

        let mut updated = Vec::new();
        for mut refreshed in fetched {
            let Some(held) = current_lessons.iter().find(|l| l.day == refreshed.day) else {
                continue;
            };
            if !is_content_different(Some(held), &refreshed) {
                continue;
            }

            tracing::debug!(
                "Day {} changed: {:?}",
                refreshed.day,
                changed_fields(held, &refreshed)
            );
            refreshed.preserve_completion_from(held);
            updated.push(refreshed);
        }

        if updated.is_empty() {
            return false;
        }

        let result = self.with_store(|s| {
            s.store_lessons(&updated)?;
            for lesson in updated.iter().filter(|l| l.completed) {
                if !s.is_lesson_completed(lesson.day)? {
                    s.update_lesson_completion(lesson.day, true, lesson.completion_timestamp)?;
                }
            }
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!("Failed to cache updated lessons: {}", e);
        }

        tracing::info!("Lesson content updated from feed ({} days)", updated.len());
        true
    }

    /// Persist a completion change for a day.
    pub fn record_completion(
        &self,
        day: u32,
        completed: bool,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.with_store(|s| s.update_lesson_completion(day, completed, timestamp))
    }

    /// Cached lessons in a day range, empty when the store is unavailable.
    pub fn cached_lessons(&self, start_day: u32, end_day: u32) -> Vec<LessonRecord> {
        self.with_store(|s| s.get_lessons(start_day, end_day))
            .unwrap_or_else(|e| {
                tracing::warn!("Cache read failed: {}", e);
                Vec::new()
            })
    }

    /// Day the learner was last viewing.
    pub fn saved_current_day(&self) -> Option<u32> {
        self.with_store(|s| s.get_current_day()).unwrap_or_else(|e| {
            tracing::warn!("Could not read current day: {}", e);
            None
        })
    }

    pub fn save_current_day(&self, day: u32) {
        if let Err(e) = self.with_store(|s| s.set_current_day(day)) {
            tracing::warn!("Could not save current day {}: {}", day, e);
        }
    }

    /// Seed the cache with the bundled lessons for days not cached yet.
    pub fn seed_from_fallback(&self) -> usize {
        match self.with_store(|s| s.seed_lessons(fallback::lessons())) {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Failed to seed bundled lessons: {}", e);
                0
            }
        }
    }

    // === Private methods ===

    fn lock_store(&self) -> Result<MutexGuard<'_, SqliteLessonStore>, StoreError> {
        self.inner.store.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&SqliteLessonStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let store = self.lock_store()?;
        f(&store)
    }

    async fn fetch_remote(&self, query: &FeedQuery) -> Result<Vec<LessonRecord>, FeedError> {
        let response = self.inner.fetcher.fetch(query).await?;
        let lessons = normalize_lessons(parse_entries(&response)?);
        if lessons.is_empty() {
            return Err(FeedError::Empty);
        }
        Ok(lessons)
    }

    fn merge_completion(&self, lessons: Vec<LessonRecord>) -> Vec<LessonRecord> {
        let store = match self.lock_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Completion state unavailable: {}", e);
                return lessons;
            }
        };

        lessons
            .into_iter()
            .map(|lesson| {
                let day = lesson.day;
                let completed_at = store
                    .get_lesson_completion_timestamp(day)
                    .unwrap_or_else(|e| {
                        tracing::warn!("Completion read for day {} failed: {}", day, e);
                        None
                    });
                lesson.with_completion(completed_at)
            })
            .collect()
    }

    fn cache_lessons(&self, lessons: &[LessonRecord]) {
        match self.with_store(|s| s.store_lessons(lessons)) {
            Ok(changed) => tracing::debug!("Cached {} lessons ({} changed)", lessons.len(), changed),
            Err(e) => tracing::warn!("Failed to cache lessons: {}", e),
        }
    }
}
