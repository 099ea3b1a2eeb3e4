//! Integration tests for the viewer session.

mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{lesson, lessons, service_with, FakeFeed};
use lesson_core::{fallback, UnlockStatus};
use pretty_assertions::assert_eq;
use server_school_lib::session::{LessonSession, NavigationError, NextStatus, Progress};
use server_school_lib::sync::FeedQuery;

fn window() -> chrono::Duration {
    chrono::Duration::hours(24)
}

// ============================================================================
// Opening
// ============================================================================

#[tokio::test]
async fn fresh_session_starts_on_day_one() {
    let feed = FakeFeed::new(lessons(1, 5));
    let session = LessonSession::open(service_with(feed.clone()), window()).await;

    assert_eq!(session.current_day(), 1);
    assert_eq!(session.current(), Some(lesson(1)));
    assert_eq!(feed.queries(), vec![FeedQuery::Range { start: 1, end: 1 }]);
    assert_eq!(
        session.progress(),
        Progress {
            completed: 0,
            total: 1
        }
    );
}

#[tokio::test]
async fn saved_day_is_restored_with_earlier_lessons() {
    let feed = FakeFeed::new(lessons(1, 5));
    let service = service_with(feed);
    service.save_current_day(3);

    let session = LessonSession::open(service, window()).await;
    assert_eq!(session.current_day(), 3);
    assert_eq!(session.lessons(), lessons(1, 3));
}

#[tokio::test]
async fn offline_session_uses_bundled_lessons() {
    let feed = FakeFeed::new(Vec::new());
    feed.set_failing(true);
    let service = service_with(feed);
    service.save_current_day(9);

    let session = LessonSession::open(service, window()).await;
    let bundled = fallback::lessons();
    let last = bundled.last().unwrap();

    assert_eq!(session.lessons().len(), bundled.len());
    assert_eq!(session.current_day(), last.day);
    assert_eq!(session.current().unwrap().title, last.title);
}

// ============================================================================
// Completion and navigation
// ============================================================================

#[tokio::test]
async fn next_day_requires_completion_and_elapsed_window() {
    let feed = FakeFeed::new(lessons(1, 5));
    let service = service_with(feed.clone());
    let mut session = LessonSession::open(service.clone(), window()).await;
    let done = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();

    assert_eq!(session.next_status(done), NextStatus::NotCompleted);
    assert_eq!(
        session.go_next(done).await,
        Err(NavigationError::NotCompleted(1))
    );

    let completed = session.complete_current(done).unwrap();
    assert_eq!(completed.completion_timestamp, Some(done));
    assert!(!session.can_go_next(done));
    assert_eq!(session.unlock_status(done).countdown_label(), "24:00:00");
    assert_eq!(
        session.go_next(done).await,
        Err(NavigationError::Locked("24:00:00".to_string()))
    );
    assert_eq!(
        session.next_status(done + chrono::Duration::hours(23)),
        NextStatus::Waiting {
            status: UnlockStatus::Locked {
                hours: 1,
                minutes: 0,
                seconds: 0
            }
        }
    );

    let later = done + chrono::Duration::hours(25);
    assert!(session.can_go_next(later));
    let next = session.go_next(later).await.unwrap();
    assert_eq!(next, lesson(2));
    assert_eq!(session.current_day(), 2);
    assert_eq!(service.saved_current_day(), Some(2));
    assert_eq!(feed.queries().last(), Some(&FeedQuery::Day(2)));
}

#[tokio::test]
async fn completion_is_persisted_once() {
    let feed = FakeFeed::new(lessons(1, 5));
    let service = service_with(feed);
    let mut session = LessonSession::open(service.clone(), window()).await;
    let first = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();

    session.complete_current(first);
    session.complete_current(first + chrono::Duration::hours(2));

    let cached = service.cached_lessons(1, 1);
    assert!(cached[0].completed);
    assert_eq!(cached[0].completion_timestamp, Some(first));
    assert_eq!(session.current().unwrap().completion_timestamp, Some(first));
    assert_eq!(session.progress().completed, 1);
}

#[tokio::test]
async fn quiz_answers_are_checked_against_current_lesson() {
    let feed = FakeFeed::new(lessons(1, 1));
    let session = LessonSession::open(service_with(feed), window()).await;

    let right = session.check_answer(0).unwrap();
    assert!(right.correct);
    assert_eq!(right.correct_answer, 0);
    assert_eq!(right.correct_option, "First");
    assert_eq!(right.explanation, "The first one.");

    assert!(!session.check_answer(3).unwrap().correct);
}

#[tokio::test]
async fn previous_and_jump_navigation() {
    let feed = FakeFeed::new(lessons(1, 5));
    let service = service_with(feed);
    service.save_current_day(2);
    let mut session = LessonSession::open(service.clone(), window()).await;

    assert_eq!(session.go_previous().map(|l| l.day), Some(1));
    assert_eq!(session.go_previous(), None);
    assert_eq!(session.current_day(), 1);

    let jumped = session.go_to_day(4).await.unwrap();
    assert_eq!(jumped.day, 4);
    assert_eq!(service.saved_current_day(), Some(4));

    assert_eq!(
        session.go_to_day(99).await,
        Err(NavigationError::Unavailable(99))
    );
    assert_eq!(session.current_day(), 4);
}

// ============================================================================
// Background work
// ============================================================================

#[tokio::test]
async fn preload_caches_upcoming_days() {
    let feed = FakeFeed::new(lessons(1, 5));
    let service = service_with(feed.clone());
    let session = LessonSession::open(service.clone(), window()).await;

    let preloaded = session.preload_upcoming(3).await.unwrap();
    assert_eq!(preloaded, 3);
    assert_eq!(service.cached_lessons(2, 4), lessons(2, 4));
    assert_eq!(
        feed.queries().last(),
        Some(&FeedQuery::Range { start: 2, end: 4 })
    );
}

#[tokio::test]
async fn countdown_only_runs_while_locked() {
    let feed = FakeFeed::new(lessons(1, 5));
    let mut session = LessonSession::open(service_with(feed), window()).await;

    assert!(session.start_countdown(Utc::now()).is_none());

    session.complete_current(Utc::now());
    let status = session.start_countdown(Utc::now()).unwrap();
    assert!(!status.borrow().is_unlocked());
    assert!(session.has_countdown());

    session.go_to_day(2).await.unwrap();
    assert!(!session.has_countdown());
}

#[tokio::test]
async fn restarting_countdown_cancels_the_previous_one() {
    let feed = FakeFeed::new(lessons(1, 5));
    let mut session = LessonSession::open(service_with(feed), window()).await;
    session.complete_current(Utc::now());

    let mut first = session.start_countdown(Utc::now()).unwrap();
    let _second = session.start_countdown(Utc::now()).unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while first.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok());
    assert!(session.has_countdown());
}

#[tokio::test(start_paused = true)]
async fn update_check_refreshes_changed_lessons() {
    let feed = FakeFeed::new(lessons(1, 5));
    let mut session = LessonSession::open(service_with(feed.clone()), window()).await;
    session.complete_current(Utc::now());

    let (checker, mut notices) = session.spawn_update_checker(Duration::from_secs(60));
    assert!(checker.is_running());

    let mut revised = lesson(1);
    revised.title = "Revised Lesson 1".to_string();
    feed.update_lesson(revised);

    let notice = tokio::time::timeout(Duration::from_secs(120), notices.recv())
        .await
        .unwrap();
    assert!(notice.is_some());

    assert_eq!(session.refresh_from_store(), 1);
    let current = session.current().unwrap();
    assert_eq!(current.title, "Revised Lesson 1");
    assert!(current.completed);

    checker.stop();
}

#[tokio::test(start_paused = true)]
async fn unchanged_feed_sends_no_notice() {
    let feed = FakeFeed::new(lessons(1, 5));
    let session = LessonSession::open(service_with(feed.clone()), window()).await;

    let (_checker, mut notices) = session.spawn_update_checker(Duration::from_secs(60));

    let waited = tokio::time::timeout(Duration::from_secs(300), notices.recv()).await;
    assert!(waited.is_err());
    assert!(feed.queries().len() > 1);
}

#[tokio::test(start_paused = true)]
async fn jumping_ahead_does_not_trigger_update_notices() {
    let feed = FakeFeed::new(lessons(1, 7));
    let service = service_with(feed);
    let mut session = LessonSession::open(service.clone(), window()).await;
    session.go_to_day(7).await.unwrap();

    let held: Vec<u32> = session.lessons().iter().map(|l| l.day).collect();
    assert_eq!(held, vec![1, 7]);
    assert!(!service.check_for_updates(&session.lessons()).await);

    let (_checker, mut notices) = session.spawn_update_checker(Duration::from_secs(60));
    let waited = tokio::time::timeout(Duration::from_secs(300), notices.recv()).await;
    assert!(waited.is_err());
    assert_eq!(session.refresh_from_store(), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_check_interval_keeps_checker_alive() {
    let feed = FakeFeed::new(lessons(1, 3));
    let session = LessonSession::open(service_with(feed.clone()), window()).await;

    let (checker, mut notices) = session.spawn_update_checker(Duration::ZERO);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(checker.is_running());

    let mut revised = lesson(1);
    revised.title = "Revised Lesson 1".to_string();
    feed.update_lesson(revised);

    let notice = tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .unwrap();
    assert!(notice.is_some());
}
