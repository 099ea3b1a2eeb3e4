pub mod config;
pub mod db;
pub mod logging;
pub mod session;
pub mod sync;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use lesson_core::{LessonRecord, UnlockStatus};
use tokio::sync::watch;

use crate::config::ViewerConfig;
use crate::db::SqliteLessonStore;
use crate::session::{wait_unlocked, LessonSession, NextStatus};
use crate::sync::{HttpFetcher, LessonSyncService};

pub use crate::session::NavigationError;

/// Build the sync service from configuration, opening the cache on disk.
pub fn build_service(config: &ViewerConfig) -> anyhow::Result<LessonSyncService> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Opening lesson cache at {}", config.db_path.display());
    let store = SqliteLessonStore::open(&config.db_path)?;
    let fetcher = HttpFetcher::from_config(config);

    let service = LessonSyncService::new(Arc::new(Mutex::new(store)), Arc::new(fetcher));
    if config.seed_fallback {
        let seeded = service.seed_from_fallback();
        tracing::info!("Seeded {} bundled lessons", seeded);
    }
    Ok(service)
}

pub async fn run() -> anyhow::Result<()> {
    logging::init();

    let config = ViewerConfig::from_env()?;
    let service = build_service(&config)?;

    let mut session = LessonSession::open(service, config.unlock_window).await;
    print_session(&session);

    let preload =
        (config.preload_ahead > 0).then(|| session.preload_upcoming(config.preload_ahead));
    let (checker, mut notices) = session.spawn_update_checker(config.refresh_interval);
    let mut countdown = session.start_countdown(Utc::now());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            _ = next_unlock(&mut countdown), if countdown.is_some() => {
                countdown = None;
                println!("Next lesson is available.");
            }
            Some(notice) = notices.recv() => {
                let replaced = session.refresh_from_store();
                tracing::info!(
                    "Update check at {} refreshed {} lessons",
                    notice.checked_at,
                    replaced
                );
                if replaced > 0 {
                    print_session(&session);
                }
            }
        }
    }

    checker.stop();
    if let Some(preload) = preload {
        preload.abort();
    }
    Ok(())
}

async fn next_unlock(countdown: &mut Option<watch::Receiver<UnlockStatus>>) -> UnlockStatus {
    match countdown {
        Some(status) => wait_unlocked(status).await,
        None => std::future::pending().await,
    }
}

fn print_session(session: &LessonSession) {
    let progress = session.progress();
    println!(
        "Day {} ({} of {} completed)",
        session.current_day(),
        progress.completed,
        progress.total
    );

    match session.current() {
        Some(lesson) => print_lesson(&lesson),
        None => println!("No lesson available"),
    }

    match session.next_status(Utc::now()) {
        NextStatus::NotCompleted => println!("Complete this lesson to unlock the next one."),
        NextStatus::Waiting { status } => {
            println!("Next lesson unlocks in {}", status.countdown_label())
        }
        NextStatus::Available => println!("Next lesson is available."),
    }
}

fn print_lesson(lesson: &LessonRecord) {
    println!();
    println!("{}", lesson.title);
    println!();
    println!("Tip: {}", lesson.tip.title);
    println!("  {}", lesson.tip.description);
    println!();
    println!("Quiz: {}", lesson.quiz.question);
    for (i, option) in lesson.quiz.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    println!();
    println!("\"{}\" - {}", lesson.quote.text, lesson.quote.author);
    println!();
}
