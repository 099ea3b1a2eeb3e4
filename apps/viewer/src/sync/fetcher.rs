//! Remote feed transport.

use async_trait::async_trait;
use lesson_core::FeedResponse;
use reqwest::Client;
use std::fmt;

use super::FeedError;
use crate::config::ViewerConfig;

/// Row filter sent to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedQuery {
    Day(u32),
    Range { start: u32, end: u32 },
}

impl FeedQuery {
    /// Structured-query expression selecting the requested rows.
    pub fn filter(&self) -> String {
        match *self {
            Self::Day(day) => format!("day={}", day),
            Self::Range { start, end } => format!("day>={} and day<={}", start, end),
        }
    }
}

impl fmt::Display for FeedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filter())
    }
}

/// Source of raw feed responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, query: &FeedQuery) -> Result<FeedResponse, FeedError>;
}

/// Fetches lessons from the public spreadsheet feed over HTTP.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    feed_id: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, feed_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            feed_id: feed_id.into(),
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.feed_base_url.clone(), config.feed_id.clone())
    }

    fn feed_url(&self) -> String {
        format!(
            "{}/feeds/list/{}/1/public/values",
            self.base_url, self.feed_id
        )
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, query: &FeedQuery) -> Result<FeedResponse, FeedError> {
        let filter = query.filter();
        tracing::debug!("Fetching lessons where {}", filter);

        let resp = self
            .client
            .get(self.feed_url())
            .query(&[("alt", "json"), ("sq", filter.as_str())])
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(FeedError::Backend { status, message });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        FeedResponse::from_json(&body).map_err(FeedError::from)
    }
}
