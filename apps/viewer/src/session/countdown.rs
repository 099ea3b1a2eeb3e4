//! Unlock countdown for the lesson currently on screen.

use chrono::{DateTime, Utc};
use lesson_core::{time_remaining, UnlockStatus};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const MIN_TICK: Duration = Duration::from_millis(10);

/// Running countdown. Dropping the handle stops it.
pub struct CountdownHandle {
    task: JoinHandle<()>,
    status: watch::Receiver<UnlockStatus>,
}

impl CountdownHandle {
    /// Start ticking towards `completed_at + window`, publishing a status every `tick`.
    ///
    /// The task ends on its own once the lesson unlocks.
    pub fn start(completed_at: DateTime<Utc>, window: chrono::Duration, tick: Duration) -> Self {
        let initial = time_remaining(completed_at, Utc::now(), window);
        let (tx, rx) = watch::channel(initial);

        let tick = tick.max(MIN_TICK);

        let task = tokio::spawn(async move {
            loop {
                let status = time_remaining(completed_at, Utc::now(), window);
                if tx.send(status).is_err() || status.is_unlocked() {
                    break;
                }
                // Never sleep past the unlock moment.
                let wait = status
                    .remaining()
                    .to_std()
                    .map_or(tick, |left| left.min(tick));
                tokio::time::sleep(wait).await;
            }
        });

        Self { task, status: rx }
    }

    /// Latest published status.
    pub fn status(&self) -> UnlockStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UnlockStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Wait until a countdown reports the lesson unlocked, or stops publishing.
pub async fn wait_unlocked(status: &mut watch::Receiver<UnlockStatus>) -> UnlockStatus {
    loop {
        let current = *status.borrow_and_update();
        if current.is_unlocked() {
            return current;
        }
        if status.changed().await.is_err() {
            return *status.borrow();
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
