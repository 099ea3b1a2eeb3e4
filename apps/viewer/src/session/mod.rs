//! Viewer session: the lessons on hand, the day being viewed, and the
//! unlock gate between days.

pub mod countdown;
pub mod updates;

pub use countdown::{wait_unlocked, CountdownHandle};
pub use updates::{UpdateChecker, UpdateNotice};

use chrono::{DateTime, Utc};
use lesson_core::{fallback, time_remaining, LessonRecord, UnlockStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::sync::LessonSyncService;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Why navigation was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("day {0} is not completed yet")]
    NotCompleted(u32),

    #[error("next lesson unlocks in {0}")]
    Locked(String),

    #[error("no lesson available for day {0}")]
    Unavailable(u32),
}

/// Whether the learner may move past the current lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStatus {
    NotCompleted,
    Waiting { status: UnlockStatus },
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: usize,
    pub correct_option: String,
    pub explanation: String,
}

/// Session state owned by the view layer.
pub struct LessonSession {
    service: LessonSyncService,
    lessons: Arc<Mutex<BTreeMap<u32, LessonRecord>>>,
    current_day: u32,
    unlock_window: chrono::Duration,
    countdown: Option<CountdownHandle>,
}

impl LessonSession {
    /// Restore the saved day and load every lesson up to it.
    pub async fn open(service: LessonSyncService, unlock_window: chrono::Duration) -> Self {
        let saved_day = service.saved_current_day().unwrap_or(1).max(1);

        let mut loaded = service.get_initial_lessons(saved_day).await;
        if loaded.is_empty() {
            tracing::warn!("Using bundled lesson data");
            loaded = fallback::lessons().to_vec();
        }

        let lessons: BTreeMap<u32, LessonRecord> =
            loaded.into_iter().map(|l| (l.day, l)).collect();

        let current_day = if lessons.contains_key(&saved_day) {
            saved_day
        } else {
            lessons
                .range(..saved_day)
                .next_back()
                .or_else(|| lessons.iter().next())
                .map(|(day, _)| *day)
                .unwrap_or(saved_day)
        };

        Self {
            service,
            lessons: Arc::new(Mutex::new(lessons)),
            current_day,
            unlock_window,
            countdown: None,
        }
    }

    pub fn current_day(&self) -> u32 {
        self.current_day
    }

    pub fn current(&self) -> Option<LessonRecord> {
        self.lessons_guard().get(&self.current_day).cloned()
    }

    /// Snapshot of the held lessons, ordered by day.
    pub fn lessons(&self) -> Vec<LessonRecord> {
        self.lessons_guard().values().cloned().collect()
    }

    pub fn progress(&self) -> Progress {
        let lessons = self.lessons_guard();
        Progress {
            completed: lessons.values().filter(|l| l.completed).count(),
            total: lessons.len(),
        }
    }

    /// Check a quiz answer for the current lesson.
    pub fn check_answer(&self, selected: usize) -> Option<AnswerFeedback> {
        self.current().map(|lesson| AnswerFeedback {
            correct: lesson.quiz.is_correct(selected),
            correct_answer: lesson.quiz.correct_answer,
            correct_option: lesson.quiz.correct_option().to_string(),
            explanation: lesson.quiz.explanation,
        })
    }

    /// Mark the current lesson completed and persist it.
    pub fn complete_current(&mut self, now: DateTime<Utc>) -> Option<LessonRecord> {
        let completed = {
            let mut lessons = self.lessons_guard();
            let lesson = lessons.get_mut(&self.current_day)?;
            lesson.mark_completed(now);
            lesson.clone()
        };

        if let Err(e) = self.service.record_completion(
            completed.day,
            true,
            completed.completion_timestamp,
        ) {
            tracing::warn!("Failed to save completion for day {}: {}", completed.day, e);
        }

        Some(completed)
    }

    /// Unlock state of the day after the current one. Unlocked when the
    /// current lesson has no completion time to count from.
    pub fn unlock_status(&self, now: DateTime<Utc>) -> UnlockStatus {
        self.current()
            .and_then(|l| l.completion_timestamp)
            .map(|completed_at| time_remaining(completed_at, now, self.unlock_window))
            .unwrap_or(UnlockStatus::Unlocked)
    }

    pub fn next_status(&self, now: DateTime<Utc>) -> NextStatus {
        let Some(lesson) = self.current() else {
            return NextStatus::NotCompleted;
        };
        if !lesson.completed {
            return NextStatus::NotCompleted;
        }
        match self.unlock_status(now) {
            UnlockStatus::Unlocked => NextStatus::Available,
            status => NextStatus::Waiting { status },
        }
    }

    pub fn can_go_next(&self, now: DateTime<Utc>) -> bool {
        self.next_status(now) == NextStatus::Available
    }

    /// Move to the next day once the current one is completed and unlocked.
    pub async fn go_next(&mut self, now: DateTime<Utc>) -> Result<LessonRecord, NavigationError> {
        match self.next_status(now) {
            NextStatus::NotCompleted => Err(NavigationError::NotCompleted(self.current_day)),
            NextStatus::Waiting { status } => {
                Err(NavigationError::Locked(status.countdown_label()))
            }
            NextStatus::Available => self.load_day(self.current_day + 1).await,
        }
    }

    /// Move to the closest earlier day on hand.
    pub fn go_previous(&mut self) -> Option<LessonRecord> {
        let previous = self
            .lessons_guard()
            .range(..self.current_day)
            .next_back()
            .map(|(_, l)| l.clone())?;
        self.set_current_day(previous.day);
        Some(previous)
    }

    /// Jump straight to a day, fetching it when not on hand.
    pub async fn go_to_day(&mut self, day: u32) -> Result<LessonRecord, NavigationError> {
        self.load_day(day).await
    }

    /// Fetch the next `count` days in the background so they are cached ahead of time.
    pub fn preload_upcoming(&self, count: u32) -> JoinHandle<usize> {
        let service = self.service.clone();
        let start = self.current_day + 1;
        let end = self.current_day + count;
        tokio::spawn(async move {
            let upcoming = service.fetch_lessons(start, end).await;
            tracing::info!("Preloaded {} upcoming lessons", upcoming.len());
            upcoming.len()
        })
    }

    /// Reload held days from the cache after an update notice.
    pub fn refresh_from_store(&mut self) -> usize {
        let (start, end) = {
            let lessons = self.lessons_guard();
            match (lessons.keys().next(), lessons.keys().next_back()) {
                (Some(start), Some(end)) => (*start, *end),
                _ => return 0,
            }
        };

        let cached = self.service.cached_lessons(start, end);
        let mut lessons = self.lessons_guard();
        let mut replaced = 0;
        for lesson in cached {
            if let Some(held) = lessons.get_mut(&lesson.day) {
                if *held != lesson {
                    *held = lesson;
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Start the unlock countdown for the current lesson.
    ///
    /// Any countdown already running is cancelled first. Returns `None` when
    /// the current lesson is not waiting on the unlock window.
    pub fn start_countdown(&mut self, now: DateTime<Utc>) -> Option<watch::Receiver<UnlockStatus>> {
        self.stop_countdown();

        let completed_at = match self.next_status(now) {
            NextStatus::Waiting { .. } => self.current()?.completion_timestamp?,
            _ => return None,
        };

        let handle = CountdownHandle::start(completed_at, self.unlock_window, COUNTDOWN_TICK);
        let receiver = handle.subscribe();
        self.countdown = Some(handle);
        Some(receiver)
    }

    pub fn stop_countdown(&mut self) {
        self.countdown = None;
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    /// Spawn the periodic update check over the lessons held by this session.
    pub fn spawn_update_checker(
        &self,
        every: Duration,
    ) -> (UpdateChecker, mpsc::UnboundedReceiver<UpdateNotice>) {
        let lessons = self.lessons.clone();
        UpdateChecker::spawn(self.service.clone(), every, move || match lessons.lock() {
            Ok(lessons) => lessons.values().cloned().collect(),
            Err(_) => Vec::new(),
        })
    }

    // === Private methods ===

    fn lessons_guard(&self) -> MutexGuard<'_, BTreeMap<u32, LessonRecord>> {
        self.lessons
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load_day(&mut self, day: u32) -> Result<LessonRecord, NavigationError> {
        let held = self.lessons_guard().get(&day).cloned();
        let lesson = match held {
            Some(lesson) => lesson,
            None => {
                let lesson = self
                    .service
                    .get_lesson_by_day(day)
                    .await
                    .ok_or(NavigationError::Unavailable(day))?;
                self.lessons_guard().insert(day, lesson.clone());
                lesson
            }
        };

        self.set_current_day(day);
        Ok(lesson)
    }

    fn set_current_day(&mut self, day: u32) {
        self.stop_countdown();
        self.current_day = day;
        self.service.save_current_day(day);
    }
}
