//! In-memory content source backed by a fixed set of documents

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use super::{ContentSource, FetchError, Ordering, PageToken, QueryOptions, QueryPage};
use crate::content::{decode_documents, RawDocument};

/// Serves documents from memory, e.g. loaded from a JSON fixtures file.
///
/// Drafts (documents without a first publication date) are only visible
/// when drafts are enabled, mirroring preview mode on the real API.
pub struct MemorySource {
    documents: Vec<RawDocument>,
    include_drafts: bool,
    requests: AtomicUsize,
}

/// What a memory page token encodes
#[derive(Debug, Serialize, Deserialize)]
struct MemoryCursor {
    doc_type: String,
    options: QueryOptions,
    page: usize,
}

impl MemorySource {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            include_drafts: false,
            requests: AtomicUsize::new(0),
        }
    }

    /// Load documents from a JSON file.
    ///
    /// The file holds either an array of documents or a search response
    /// object with a `results` array.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixtures {:?}", path))?;

        let results = match value {
            serde_json::Value::Object(mut map) => map
                .remove("results")
                .ok_or_else(|| anyhow::anyhow!("Fixtures object in {:?} has no results", path))?,
            other => other,
        };

        let entries: Vec<serde_json::Value> = serde_json::from_value(results)
            .with_context(|| format!("Fixtures in {:?} are not a list of documents", path))?;
        let documents = decode_documents(entries);
        tracing::debug!("Loaded {} documents from {:?}", documents.len(), path);
        Ok(Self::new(documents))
    }

    /// Make drafts visible
    pub fn with_drafts(mut self, include_drafts: bool) -> Self {
        self.include_drafts = include_drafts;
        self
    }

    /// Number of requests served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    fn visible(&self, doc: &RawDocument) -> bool {
        self.include_drafts || !doc.is_draft()
    }

    fn page(
        &self,
        cursor: &MemoryCursor,
        token: Option<&PageToken>,
    ) -> Result<QueryPage, FetchError> {
        let options = &cursor.options;
        let mut matching: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|d| d.doc_type == cursor.doc_type && self.visible(d))
            .filter(|d| match (options.published_after, d.published_at()) {
                (Some(after), Some(date)) => date > after,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|d| match (options.published_before, d.published_at()) {
                (Some(before), Some(date)) => date < before,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();

        // Drafts have no date yet and count as the newest documents
        matching.sort_by(|a, b| {
            let by_date = match (a.published_at(), b.published_at()) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            };
            by_date.then_with(|| a.uid.cmp(&b.uid))
        });
        if options.ordering == Ordering::Descending {
            matching.reverse();
        }

        let page_size = options.page_size.max(1);
        let start = cursor
            .page
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(page_size))
            .ok_or_else(|| {
                let token = token.map(|t| t.as_str().to_string());
                FetchError::InvalidToken(token.unwrap_or_default())
            })?;
        let results: Vec<RawDocument> = matching
            .iter()
            .skip(start)
            .take(page_size)
            .map(|d| (*d).clone())
            .collect();

        let next_page = if start.saturating_add(page_size) < matching.len() {
            let next = MemoryCursor {
                doc_type: cursor.doc_type.clone(),
                options: options.clone(),
                page: cursor.page + 1,
            };
            Some(PageToken::new(serde_json::to_string(&next)?))
        } else {
            None
        };

        Ok(QueryPage { results, next_page })
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryPage, FetchError> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        let cursor = MemoryCursor {
            doc_type: doc_type.to_string(),
            options: options.clone(),
            page: 1,
        };
        self.page(&cursor, None)
    }

    async fn fetch_page(&self, token: &PageToken) -> Result<QueryPage, FetchError> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        let cursor: MemoryCursor = serde_json::from_str(token.as_str())
            .map_err(|_| FetchError::InvalidToken(token.as_str().to_string()))?;
        self.page(&cursor, Some(token))
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, FetchError> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        self.documents
            .iter()
            .filter(|d| self.visible(d))
            .find(|d| d.doc_type == doc_type && d.uid.as_deref() == Some(uid))
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }
}
