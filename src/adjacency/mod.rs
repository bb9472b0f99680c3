//! Previous/next post resolution by publication date

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::RawDocument;
use crate::source::{ContentSource, FetchError, Ordering, QueryOptions};

/// Link target for post navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub uid: String,
    pub title: String,
}

/// Chronological neighbours of a post
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Adjacency {
    /// Closest post published before the target
    pub previous: Option<NavLink>,
    /// Closest post published after the target
    pub next: Option<NavLink>,
}

/// Find the posts published right before and right after `uid`.
///
/// Issues one single-result query per direction, pivoting on `published`.
/// Drafts (no publication date) have no neighbours and cost no queries.
///
/// Both ranges are strict, so a post published at the exact same instant
/// as the pivot is never a neighbour. With ties the links are not
/// symmetric: for A(t1), B(t2), C(t2), D(t3), next(B) is D while prev(D)
/// is C.
pub async fn resolve(
    source: &dyn ContentSource,
    doc_type: &str,
    uid: &str,
    published: Option<DateTime<Utc>>,
) -> Result<Adjacency, FetchError> {
    let Some(pivot) = published else {
        return Ok(Adjacency::default());
    };

    let before = QueryOptions::default()
        .page_size(1)
        .ordering(Ordering::Descending)
        .published_before(pivot);
    let after = QueryOptions::default()
        .page_size(1)
        .ordering(Ordering::Ascending)
        .published_after(pivot);

    let (previous, next) = tokio::try_join!(
        source.query_by_type(doc_type, &before),
        source.query_by_type(doc_type, &after),
    )?;

    Ok(Adjacency {
        previous: neighbour(previous.results, uid),
        next: neighbour(next.results, uid),
    })
}

fn neighbour(results: Vec<RawDocument>, target: &str) -> Option<NavLink> {
    let doc = results.into_iter().next()?;
    let uid = doc.uid.as_deref().filter(|u| !u.is_empty() && *u != target)?;
    Some(NavLink {
        uid: uid.to_string(),
        title: doc.title().unwrap_or(uid).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_timestamp;
    use crate::source::MemorySource;
    use serde_json::json;

    fn doc(uid: &str, date: &str) -> RawDocument {
        RawDocument {
            id: uid.to_string(),
            uid: Some(uid.to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: Some(date.to_string()),
            last_publication_date: None,
            lang: None,
            tags: Vec::new(),
            data: json!({ "title": format!("Post {}", uid), "content": [] }),
        }
    }

    fn corpus() -> Vec<RawDocument> {
        vec![
            doc("c", "2021-03-01T00:00:00+0000"),
            doc("a", "2021-01-01T00:00:00+0000"),
            doc("b", "2021-02-01T00:00:00+0000"),
        ]
    }

    async fn adjacency_of(source: &MemorySource, uid: &str) -> Adjacency {
        let target = source.get_by_uid("posts", uid).await.unwrap();
        resolve(source, "posts", uid, target.published_at())
            .await
            .unwrap()
    }

    fn link(uid: &str) -> Option<NavLink> {
        Some(NavLink {
            uid: uid.to_string(),
            title: format!("Post {}", uid),
        })
    }

    #[tokio::test]
    async fn test_middle_post_has_both_neighbours() {
        let source = MemorySource::new(corpus());
        let adjacency = adjacency_of(&source, "b").await;
        assert_eq!(adjacency.previous, link("a"));
        assert_eq!(adjacency.next, link("c"));
    }

    #[tokio::test]
    async fn test_first_and_last_posts() {
        let source = MemorySource::new(corpus());

        let first = adjacency_of(&source, "a").await;
        assert_eq!(first.previous, None);
        assert_eq!(first.next, link("b"));

        let last = adjacency_of(&source, "c").await;
        assert_eq!(last.previous, link("b"));
        assert_eq!(last.next, None);
    }

    #[tokio::test]
    async fn test_single_post_corpus() {
        let source = MemorySource::new(vec![doc("only", "2021-01-01T00:00:00+0000")]);
        assert_eq!(adjacency_of(&source, "only").await, Adjacency::default());
    }

    #[tokio::test]
    async fn test_neighbours_are_antisymmetric() {
        let source = MemorySource::new(corpus());
        for uid in ["a", "b", "c"] {
            let adjacency = adjacency_of(&source, uid).await;
            if let Some(next) = adjacency.next {
                let back = adjacency_of(&source, &next.uid).await;
                assert_eq!(back.previous.map(|p| p.uid), Some(uid.to_string()));
            }
            if let Some(previous) = adjacency.previous {
                let forward = adjacency_of(&source, &previous.uid).await;
                assert_eq!(forward.next.map(|n| n.uid), Some(uid.to_string()));
            }
        }
    }

    #[tokio::test]
    async fn test_same_instant_is_not_a_neighbour() {
        let source = MemorySource::new(vec![
            doc("a", "2021-01-01T00:00:00+0000"),
            doc("b", "2021-02-01T00:00:00+0000"),
            doc("c", "2021-02-01T00:00:00+0000"),
            doc("d", "2021-03-01T00:00:00+0000"),
        ]);
        let b = adjacency_of(&source, "b").await;
        assert_eq!(b.previous, link("a"));
        assert_eq!(b.next, link("d"));

        let d = adjacency_of(&source, "d").await;
        assert_eq!(d.previous, link("c"));
    }

    #[tokio::test]
    async fn test_issues_exactly_two_queries() {
        let source = MemorySource::new(corpus());
        let pivot = parse_timestamp("2021-02-01T00:00:00+0000");
        resolve(&source, "posts", "b", pivot).await.unwrap();
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_draft_has_no_neighbours() {
        let source = MemorySource::new(corpus());
        let adjacency = resolve(&source, "posts", "draft", None).await.unwrap();
        assert_eq!(adjacency, Adjacency::default());
        assert_eq!(source.request_count(), 0);
    }

    #[test]
    fn test_neighbour_never_returns_target() {
        let results = vec![doc("b", "2021-02-01T00:00:00+0000")];
        assert_eq!(neighbour(results, "b"), None);
    }
}
