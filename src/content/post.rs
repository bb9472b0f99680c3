//! Post model and normalization from raw API documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document::{parse_timestamp, RawDocument};
use super::rich_text::{RichText, TextNode};

/// A document that could not be turned into a [`Post`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("malformed document {uid}: {reason}")]
    Malformed { uid: String, reason: String },
}

impl NormalizeError {
    fn malformed(doc: &RawDocument, reason: impl Into<String>) -> Self {
        let uid = doc
            .uid
            .clone()
            .unwrap_or_else(|| format!("<id {}>", doc.id));
        NormalizeError::Malformed {
            uid,
            reason: reason.into(),
        }
    }
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier assigned by the content source
    pub uid: String,

    /// First publication, `None` while the post is a draft
    pub first_publication_date: Option<DateTime<Utc>>,

    /// Last publication, `None` if never edited after publishing
    pub last_publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,

    /// Banner image URL
    pub banner: Option<String>,

    /// Body sections
    pub content: Vec<ContentBlock>,
}

/// A titled section of a post body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: RichText,
}

impl Post {
    /// Build a post from a raw document.
    ///
    /// Pure: dates are parsed but not shifted and the body stays as
    /// structured text.
    pub fn from_document(doc: &RawDocument) -> Result<Self, NormalizeError> {
        if doc.doc_type.is_empty() {
            return Err(NormalizeError::malformed(doc, "missing type"));
        }

        let uid = doc
            .uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| NormalizeError::malformed(doc, "missing uid"))?;

        let data = doc
            .data
            .as_object()
            .ok_or_else(|| NormalizeError::malformed(doc, "missing data payload"))?;

        let title = data
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| NormalizeError::malformed(doc, "missing title"))?
            .to_string();

        let subtitle = string_field(data, "subtitle");
        let author = string_field(data, "author");

        let banner = data
            .get("banner")
            .and_then(|b| b.get("url"))
            .and_then(|u| u.as_str())
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        let blocks = data
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| NormalizeError::malformed(doc, "missing content array"))?;

        let content = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| parse_block(doc, i, block))
            .collect::<Result<Vec<_>, _>>()?;

        let first_publication_date = timestamp_field(
            doc,
            "first_publication_date",
            doc.first_publication_date.as_deref(),
        )?;
        let last_publication_date = timestamp_field(
            doc,
            "last_publication_date",
            doc.last_publication_date.as_deref(),
        )?;

        if let (Some(first), Some(last)) = (first_publication_date, last_publication_date) {
            if last < first {
                return Err(NormalizeError::malformed(
                    doc,
                    "last publication precedes first publication",
                ));
            }
        }

        Ok(Self {
            uid,
            first_publication_date,
            last_publication_date,
            title,
            subtitle,
            author,
            banner,
            content,
        })
    }

    /// Estimated reading time in whole minutes, rounded up
    pub fn reading_time(&self, words_per_minute: usize) -> usize {
        self.word_count().div_ceil(words_per_minute.max(1))
    }

    /// Words across headings and body text, counted as space-separated pieces
    pub fn word_count(&self) -> usize {
        self.content
            .iter()
            .map(|block| {
                let body: usize = block
                    .body
                    .iter()
                    .map(|node| node.text.split(' ').count())
                    .sum();
                block.heading.split(' ').count() + body
            })
            .sum()
    }

    /// When the post was edited after its first publication
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) if last > first => Some(last),
            _ => None,
        }
    }
}

/// Normalize a batch, keeping every valid post.
///
/// A malformed document is reported and skipped; its siblings still make it
/// into the result in their original order.
pub fn normalize_batch(docs: &[RawDocument]) -> (Vec<Post>, Vec<NormalizeError>) {
    let mut posts = Vec::with_capacity(docs.len());
    let mut rejected = Vec::new();

    for doc in docs {
        match Post::from_document(doc) {
            Ok(post) => posts.push(post),
            Err(e) => {
                tracing::warn!("Skipping document: {}", e);
                rejected.push(e);
            }
        }
    }

    (posts, rejected)
}

fn string_field(data: &serde_json::Map<String, serde_json::Value>, key: &str) -> String {
    data.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn timestamp_field(
    doc: &RawDocument,
    name: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, NormalizeError> {
    value
        .map(|raw| {
            parse_timestamp(raw)
                .ok_or_else(|| NormalizeError::malformed(doc, format!("invalid {}: {}", name, raw)))
        })
        .transpose()
}

fn parse_block(
    doc: &RawDocument,
    index: usize,
    block: &serde_json::Value,
) -> Result<ContentBlock, NormalizeError> {
    let heading = block
        .get("heading")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string();

    let body = block
        .get("body")
        .and_then(|b| b.as_array())
        .ok_or_else(|| NormalizeError::malformed(doc, format!("content[{}] has no body", index)))?
        .iter()
        .map(|node| serde_json::from_value::<TextNode>(node.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| NormalizeError::malformed(doc, format!("content[{}]: {}", index, e)))?;

    Ok(ContentBlock { heading, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(uid: &str, data: serde_json::Value) -> RawDocument {
        RawDocument {
            id: format!("id-{}", uid),
            uid: Some(uid.to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            last_publication_date: None,
            lang: Some("pt-br".to_string()),
            tags: Vec::new(),
            data,
        }
    }

    fn full_data() -> serde_json::Value {
        json!({
            "title": "Como utilizar Hooks",
            "subtitle": "Pensando em sincronização",
            "author": "Joseph Oliveira",
            "banner": { "url": "https://images.prismic.io/banner.png" },
            "content": [
                {
                    "heading": "Proin et varius",
                    "body": [
                        { "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] },
                        { "type": "paragraph", "text": "sit amet", "spans": [] }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_from_document() {
        let post = Post::from_document(&doc("como-utilizar-hooks", full_data())).unwrap();
        assert_eq!(post.uid, "como-utilizar-hooks");
        assert_eq!(post.title, "Como utilizar Hooks");
        assert_eq!(post.subtitle, "Pensando em sincronização");
        assert_eq!(post.author, "Joseph Oliveira");
        assert_eq!(
            post.banner.as_deref(),
            Some("https://images.prismic.io/banner.png")
        );
        assert_eq!(post.content.len(), 1);
        assert_eq!(post.content[0].heading, "Proin et varius");
        assert_eq!(post.content[0].body.len(), 2);
    }

    #[test]
    fn test_missing_banner_url_is_none() {
        let mut data = full_data();
        data["banner"] = json!({});
        let post = Post::from_document(&doc("a", data)).unwrap();
        assert!(post.banner.is_none());

        let mut data = full_data();
        data.as_object_mut().unwrap().remove("banner");
        let post = Post::from_document(&doc("b", data)).unwrap();
        assert!(post.banner.is_none());

        let mut data = full_data();
        data["banner"] = json!({ "url": null });
        let post = Post::from_document(&doc("c", data)).unwrap();
        assert!(post.banner.is_none());
    }

    #[test]
    fn test_draft_keeps_null_publication_date() {
        let mut raw = doc("draft", full_data());
        raw.first_publication_date = None;
        let post = Post::from_document(&raw).unwrap();
        assert!(post.first_publication_date.is_none());
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let mut data = full_data();
        data.as_object_mut().unwrap().remove("content");
        let err = Post::from_document(&doc("broken", data)).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::Malformed {
                uid: "broken".to_string(),
                reason: "missing content array".to_string(),
            }
        );
    }

    #[test]
    fn test_edit_before_publication_is_malformed() {
        let mut raw = doc("backwards", full_data());
        raw.last_publication_date = Some("2020-01-01T00:00:00+0000".to_string());
        assert!(Post::from_document(&raw).is_err());
    }

    #[test]
    fn test_unparseable_date_is_malformed() {
        let mut raw = doc("bad-date", full_data());
        raw.first_publication_date = Some("15/03/2021".to_string());
        let err = Post::from_document(&raw).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::Malformed {
                uid: "bad-date".to_string(),
                reason: "invalid first_publication_date: 15/03/2021".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_type_is_malformed() {
        let mut raw = doc("untyped", full_data());
        raw.doc_type = String::new();
        assert!(Post::from_document(&raw).is_err());
    }

    #[test]
    fn test_normalize_batch_keeps_valid_siblings() {
        let mut broken = full_data();
        broken.as_object_mut().unwrap().remove("title");
        let docs = vec![
            doc("first", full_data()),
            doc("broken", broken),
            doc("third", full_data()),
        ];

        let (posts, rejected) = normalize_batch(&docs);
        let uids: Vec<_> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["first", "third"]);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_reading_time() {
        let post = Post::from_document(&doc("a", full_data())).unwrap();
        // "Proin et varius" (3) + "Lorem ipsum dolor" (3) + "sit amet" (2)
        assert_eq!(post.word_count(), 8);
        assert_eq!(post.reading_time(200), 1);
        assert_eq!(post.reading_time(3), 3);
    }

    #[test]
    fn test_edited_at() {
        let mut raw = doc("a", full_data());
        raw.last_publication_date = raw.first_publication_date.clone();
        let post = Post::from_document(&raw).unwrap();
        assert!(post.edited_at().is_none());

        raw.last_publication_date = Some("2021-03-20T10:00:00+0000".to_string());
        let post = Post::from_document(&raw).unwrap();
        assert_eq!(post.edited_at(), parse_timestamp("2021-03-20T10:00:00+0000"));
    }
}
