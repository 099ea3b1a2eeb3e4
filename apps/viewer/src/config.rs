//! Viewer configuration.

use std::path::PathBuf;
use std::time::Duration;

use lesson_core::DEFAULT_UNLOCK_WINDOW_HOURS;

pub const DEFAULT_FEED_BASE_URL: &str = "https://spreadsheets.google.com";
pub const DEFAULT_REFRESH_SECS: u64 = 5 * 60;
pub const DEFAULT_PRELOAD_AHEAD: u32 = 5;

const MAX_REFRESH_SECS: u64 = 24 * 60 * 60;
const MAX_UNLOCK_HOURS: i64 = 24 * 365;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings for the viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Identifier of the published lesson spreadsheet.
    pub feed_id: String,
    pub feed_base_url: String,
    pub db_path: PathBuf,
    /// How often held lessons are rechecked against the feed.
    pub refresh_interval: Duration,
    pub unlock_window: chrono::Duration,
    /// Days fetched ahead of the current one after startup.
    pub preload_ahead: u32,
    /// Seed the cache with bundled lessons on startup.
    pub seed_fallback: bool,
}

impl ViewerConfig {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            db_path: default_db_path(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            unlock_window: chrono::Duration::hours(DEFAULT_UNLOCK_WINDOW_HOURS),
            preload_ahead: DEFAULT_PRELOAD_AHEAD,
            seed_fallback: false,
        }
    }

    /// Load from environment variables (and a `.env` file if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feed_id = lookup("LESSON_FEED_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("LESSON_FEED_ID"))?;

        let mut config = Self::new(feed_id);

        if let Some(url) = lookup("LESSON_FEED_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config = config.with_feed_base_url(url);
        }
        if let Some(path) = lookup("LESSON_DB_PATH").filter(|v| !v.trim().is_empty()) {
            config = config.with_db_path(path);
        }
        if let Some(secs) = parse_var(&lookup, "LESSON_REFRESH_SECS", |secs: &u64| {
            (1..=MAX_REFRESH_SECS).contains(secs)
        })? {
            config = config.with_refresh_interval(Duration::from_secs(secs));
        }
        if let Some(hours) = parse_var(&lookup, "LESSON_UNLOCK_HOURS", |hours: &i64| {
            (0..=MAX_UNLOCK_HOURS).contains(hours)
        })? {
            config.unlock_window = chrono::Duration::hours(hours);
        }
        if let Some(days) = parse_var(&lookup, "LESSON_PRELOAD_AHEAD", |_: &u32| true)? {
            config.preload_ahead = days;
        }
        if let Some(seed) = parse_var(&lookup, "LESSON_SEED_FALLBACK", |_: &bool| true)? {
            config.seed_fallback = seed;
        }

        Ok(config)
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_feed_base_url(mut self, url: impl Into<String>) -> Self {
        self.feed_base_url = url.into();
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}

/// Parse an optional variable, rejecting values that fail `valid`.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    valid: impl Fn(&T) -> bool,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) if valid(&parsed) => Ok(Some(parsed)),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(None),
    }
}

/// Default cache location under the platform's local data directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("server-school")
        .join("lessons.db")
}
