//! Time gate between finishing a lesson and opening the next one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours a learner waits after completing a lesson before the next one unlocks.
pub const DEFAULT_UNLOCK_WINDOW_HOURS: i64 = 24;

/// Whether the next lesson is open yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UnlockStatus {
    Unlocked,
    Locked {
        hours: i64,
        minutes: i64,
        seconds: i64,
    },
}

impl UnlockStatus {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }

    /// Time left before unlocking, zero once unlocked.
    pub fn remaining(&self) -> Duration {
        match *self {
            Self::Unlocked => Duration::zero(),
            Self::Locked {
                hours,
                minutes,
                seconds,
            } => Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds),
        }
    }

    /// Countdown text in `HH:MM:SS` form.
    pub fn countdown_label(&self) -> String {
        match *self {
            Self::Unlocked => "00:00:00".to_string(),
            Self::Locked {
                hours,
                minutes,
                seconds,
            } => format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
        }
    }
}

/// Compute the unlock status for a lesson completed at `completed_at`.
///
/// # Arguments
/// * `completed_at` - When the lesson was completed
/// * `now` - Current time
/// * `window` - How long the next lesson stays locked
pub fn time_remaining(
    completed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: Duration,
) -> UnlockStatus {
    let remaining = (completed_at + window) - now;
    if remaining <= Duration::zero() {
        return UnlockStatus::Unlocked;
    }

    // Round partial seconds up so the label never shows 00:00:00 while locked.
    let total_seconds = (remaining + Duration::milliseconds(999)).num_seconds();
    UnlockStatus::Locked {
        hours: total_seconds / 3600,
        minutes: (total_seconds % 3600) / 60,
        seconds: total_seconds % 60,
    }
}
