//! Periodic background check for remote lesson changes.

use chrono::{DateTime, Utc};
use lesson_core::LessonRecord;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::sync::LessonSyncService;

const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Sent when a background check changed cached lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateNotice {
    pub checked_at: DateTime<Utc>,
}

/// Detached update loop. Dropping the handle stops it.
pub struct UpdateChecker {
    task: JoinHandle<()>,
}

impl UpdateChecker {
    /// Run `check_for_updates` on the lessons returned by `snapshot` every `every`.
    ///
    /// The first check happens one interval after spawning. Intervals shorter
    /// than a second are raised to one second.
    pub fn spawn<F>(
        service: LessonSyncService,
        every: Duration,
        snapshot: F,
    ) -> (Self, mpsc::UnboundedReceiver<UpdateNotice>)
    where
        F: Fn() -> Vec<LessonRecord> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let every = every.max(MIN_CHECK_INTERVAL);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let lessons = snapshot();
                if lessons.is_empty() {
                    continue;
                }
                if service.check_for_updates(&lessons).await {
                    let notice = UpdateNotice {
                        checked_at: Utc::now(),
                    };
                    if tx.send(notice).is_err() {
                        break;
                    }
                }
            }
        });

        (Self { task }, rx)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for UpdateChecker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
