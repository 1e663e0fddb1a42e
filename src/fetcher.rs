use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{info, warn};

/// One article from a fetched feed, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub title: String,
    pub link: String,
    pub content: String,
    pub published: Option<DateTime<Utc>>,
}

impl EntryRecord {
    pub fn published_label(&self) -> Option<String> {
        self.published
            .map(|published| published.format("%Y-%m-%d").to_string())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    HttpStatus(u16),
    #[error("could not parse feed: {0}")]
    Parse(#[from] parser::ParseFeedError),
}

/// Turns a feed locator into its ordered entries.
pub trait FetchService: Send + Sync {
    fn fetch(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<Vec<EntryRecord>, FetchError>> + Send;
}

/// Fetches feeds over HTTP and parses them as RSS, Atom or JSON Feed.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Feedreader/1.0 (RSS Reader)")
            .build()?;

        Ok(Self { client })
    }

    /// Map parsed feed entries to records, in feed order.
    pub fn entries_from_bytes(bytes: &[u8]) -> Result<Vec<EntryRecord>, FetchError> {
        let parsed = parser::parse(bytes)?;
        Ok(parsed
            .entries
            .into_iter()
            .filter_map(Self::entry_record)
            .collect())
    }

    /// Only http(s) links are rendered into `href`.
    pub fn is_web_link(link: &str) -> bool {
        Url::parse(link)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    pub fn entry_record(entry: Entry) -> Option<EntryRecord> {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_else(|| "Untitled".to_string());

        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        if link.is_empty() {
            warn!("Skipping entry with no link: {}", title);
            return None;
        }

        if !Self::is_web_link(&link) {
            warn!("Skipping entry with non-http link: {} ({})", title, link);
            return None;
        }

        let content = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let published: Option<DateTime<Utc>> = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.into());

        Some(EntryRecord {
            title,
            link,
            content,
            published,
        })
    }
}

impl FetchService for HttpFetcher {
    fn fetch(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<Vec<EntryRecord>, FetchError>> + Send {
        async move {
            info!("Fetching feed: {}", source);

            let response = self.client.get(source).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            let bytes = response.bytes().await?;
            let entries = Self::entries_from_bytes(&bytes)?;

            info!("Parsed {} entries from {}", entries.len(), source);
            Ok(entries)
        }
    }
}
