//! Content sources - where raw post documents come from
//!
//! Everything downstream talks to a [`ContentSource`]: the listing
//! controller pages through it with opaque [`PageToken`]s and the adjacency
//! resolver issues bounded range queries against it.

mod http;
mod memory;

pub use http::{HttpSource, HttpSourceSettings};
pub use memory::MemorySource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::content::RawDocument;

/// Errors raised while talking to a content source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("{doc_type} document {uid:?} not found")]
    NotFound { doc_type: String, uid: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("page token not issued by this source: {0}")]
    InvalidToken(String),
}

impl FetchError {
    /// Whether repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Run a request, repeating it up to `retries` more times while it fails
/// with a transient error. Waits `delay` between attempts.
pub async fn retry_transient<T, F, Fut>(
    retries: usize,
    delay: Duration,
    mut request: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;
    loop {
        match request().await {
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                tracing::warn!("Request failed ({}), retry {}/{}", e, attempt, retries);
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

/// Opaque continuation handed out by a source.
///
/// Only the source that issued a token interprets it; callers thread it
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sort direction on publication date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordering {
    Ascending,
    #[default]
    Descending,
}

/// Options for a query by document type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub page_size: usize,
    /// Ordering on first publication date
    pub ordering: Ordering,
    /// Only documents first published strictly after this instant
    pub published_after: Option<DateTime<Utc>>,
    /// Only documents first published strictly before this instant
    pub published_before: Option<DateTime<Utc>>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            ordering: Ordering::Descending,
            published_after: None,
            published_before: None,
        }
    }
}

impl QueryOptions {
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn published_after(mut self, instant: DateTime<Utc>) -> Self {
        self.published_after = Some(instant);
        self
    }

    pub fn published_before(mut self, instant: DateTime<Utc>) -> Self {
        self.published_before = Some(instant);
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPage {
    pub results: Vec<RawDocument>,
    /// `None` once there is nothing more to fetch
    pub next_page: Option<PageToken>,
}

/// A headless content API
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of documents of the given type
    async fn query_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryPage, FetchError>;

    /// The page a previously returned token points at
    async fn fetch_page(&self, token: &PageToken) -> Result<QueryPage, FetchError>;

    /// A single document by its uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, FetchError>;
}
