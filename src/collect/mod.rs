// src/collect/mod.rs
pub mod sites;

use async_trait::async_trait;
use std::time::Duration;

use crate::posting::Posting;

/// One configured search, as handed to each collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    /// Empty means "all locations".
    pub location: String,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("http request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("cannot build search url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Other(String),
}

/// Fetch + parse routine for one job board.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Up to `limit` raw postings for `search`. Postings may still be
    /// invalid (missing title/company); the tracker filters them.
    async fn collect(
        &self,
        search: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<Posting>, CollectorError>;

    /// Display name, also stored as `Posting::source`.
    fn name(&self) -> &str;
}

/// HTTP settings shared by all board collectors.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub request_timeout: Duration,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client, CollectorError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| CollectorError::Other(format!("http client: {e}")))
    }
}

/// Normalize scraped text: decode entities, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let out = html_escape::decode_html_entities(s);

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}
