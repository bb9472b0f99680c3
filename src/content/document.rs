//! Raw documents as returned by the content API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A document exactly as the content source returns it.
///
/// The envelope is kept loose: dates stay as the API sent them and a
/// missing `type` decodes as empty. Validation happens in
/// [`Post::from_document`](super::Post::from_document), one document at a
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default, deserialize_with = "loose_text")]
    pub first_publication_date: Option<String>,

    #[serde(default, deserialize_with = "loose_text")]
    pub last_publication_date: Option<String>,

    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawDocument {
    /// Title straight from the payload, without full normalization
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(|v| v.as_str())
    }

    /// Not published yet
    pub fn is_draft(&self) -> bool {
        self.first_publication_date.is_none()
    }

    /// First publication date, `None` for drafts and unparseable values
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.first_publication_date
            .as_deref()
            .and_then(parse_timestamp)
    }
}

/// Parse a content API timestamp.
///
/// Accepts RFC 3339 as well as the `2021-03-25T19:25:28+0000` form the
/// API emits (offset without a colon).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Decode the documents of a page one by one.
///
/// An entry that is not a document object is logged and dropped; the rest
/// of the page is kept in order.
pub fn decode_documents(values: Vec<serde_json::Value>) -> Vec<RawDocument> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value(value) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Skipping undecodable document at index {}: {}", i, e);
                None
            }
        })
        .collect()
}

/// Any JSON scalar as text; null stays `None`
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
