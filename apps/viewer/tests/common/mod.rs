//! Common test utilities for integration tests.
//!
//! Provides an in-process feed double and helpers for building a sync
//! service over an in-memory store.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lesson_core::{FeedEntry, FeedResponse, LessonRecord, Quiz, Quote, Tip};
use server_school_lib::db::SqliteLessonStore;
use server_school_lib::sync::{FeedError, FeedQuery, Fetcher, LessonSyncService};

/// Feed double serving a configurable set of lessons.
#[derive(Default)]
pub struct FakeFeed {
    lessons: Mutex<Vec<LessonRecord>>,
    raw_body: Mutex<Option<String>>,
    failing: AtomicBool,
    queries: Mutex<Vec<FeedQuery>>,
}

impl FakeFeed {
    pub fn new(lessons: Vec<LessonRecord>) -> Arc<Self> {
        let feed = Self::default();
        *feed.lessons.lock().unwrap() = lessons;
        Arc::new(feed)
    }

    pub fn set_lessons(&self, lessons: Vec<LessonRecord>) {
        *self.lessons.lock().unwrap() = lessons;
    }

    /// Replace a single lesson, matched by day.
    pub fn update_lesson(&self, lesson: LessonRecord) {
        let mut lessons = self.lessons.lock().unwrap();
        lessons.retain(|l| l.day != lesson.day);
        lessons.push(lesson);
    }

    /// Serve this body verbatim instead of the configured lessons.
    pub fn set_raw_body(&self, body: &str) {
        *self.raw_body.lock().unwrap() = Some(body.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn clear_queries(&self) {
        self.queries.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for FakeFeed {
    async fn fetch(&self, query: &FeedQuery) -> Result<FeedResponse, FeedError> {
        self.queries.lock().unwrap().push(*query);

        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Transport("connection refused".to_string()));
        }
        if let Some(body) = self.raw_body.lock().unwrap().as_deref() {
            return FeedResponse::from_json(body).map_err(FeedError::from);
        }

        let entries = self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| match *query {
                FeedQuery::Day(day) => l.day == day,
                FeedQuery::Range { start, end } => (start..=end).contains(&l.day),
            })
            .map(FeedEntry::from_lesson)
            .collect();
        Ok(FeedResponse::new(entries))
    }
}

/// Service over a fresh in-memory store.
pub fn service_with(feed: Arc<FakeFeed>) -> LessonSyncService {
    let store = SqliteLessonStore::open_in_memory().unwrap();
    LessonSyncService::new(Arc::new(Mutex::new(store)), feed)
}

/// Service over an on-disk store at `path`.
pub fn service_at(path: &Path, feed: Arc<FakeFeed>) -> LessonSyncService {
    let store = SqliteLessonStore::open(path).unwrap();
    LessonSyncService::new(Arc::new(Mutex::new(store)), feed)
}

/// Poison the store mutex so every store call fails with `LockPoisoned`.
pub fn poison_store(service: &LessonSyncService) {
    let store = service.store();
    let crashed = std::thread::spawn(move || {
        let _guard = store.lock().unwrap();
        panic!("writer crashed while holding the store");
    })
    .join();
    assert!(crashed.is_err());
    assert!(service.store().is_poisoned());
}

/// Distinct lesson for a day, unlike any bundled lesson.
pub fn lesson(day: u32) -> LessonRecord {
    LessonRecord {
        day,
        title: format!("Remote Lesson {}", day),
        tip: Tip {
            title: format!("Remote Tip {}", day),
            description: format!("<p>Tip body for day {}</p>", day),
        },
        quiz: Quiz {
            question: format!("Question for day {}?", day),
            options: [
                "First".to_string(),
                "Second".to_string(),
                "Third".to_string(),
                "Fourth".to_string(),
            ],
            correct_answer: 0,
            explanation: "The first one.".to_string(),
        },
        quote: Quote {
            text: format!("Quote {}", day),
            author: "Someone".to_string(),
        },
        completed: false,
        completion_timestamp: None,
    }
}

pub fn lessons(start: u32, end: u32) -> Vec<LessonRecord> {
    (start..=end).map(lesson).collect()
}
