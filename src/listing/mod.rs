//! Listing controller - the grow-only list of loaded posts behind "load more"
//!
//! The controller starts from a first page fetched elsewhere and appends one
//! page per accepted [`ListingController::load_more`] call:
//!
//! ```text
//!  new(first page) ──> Idle ──load_more──> Loading ──ok, token──> Idle
//!        │                                   │  └──ok, no token──> Exhausted
//!        └─ no token ──> Exhausted           └──error──> Idle (unchanged)
//!
//!  detach() from any phase ──> Detached
//! ```
//!
//! While Loading, further calls are dropped. Exhausted and Detached are
//! terminal.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::content::{normalize_batch, Post};
use crate::source::{retry_transient, ContentSource, FetchError, PageToken, QueryPage};

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Loading,
    Exhausted,
    Detached,
}

/// What a single `load_more` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended; `rejected` documents failed normalization
    Appended { added: usize, rejected: usize },
    /// Another load was already running; this call was dropped
    InFlight,
    /// Nothing left to load; no request was made
    Exhausted,
    /// The listing was torn down; any response was discarded
    Detached,
}

/// Plain-data view of the listing for rendering
#[derive(Debug, Clone, Serialize)]
pub struct ListingSnapshot {
    pub posts: Vec<Post>,
    /// Whether the "load more" affordance should be shown at all
    pub has_more: bool,
}

struct ListingState {
    posts: Vec<Post>,
    cursor: Option<PageToken>,
    phase: Phase,
}

/// Owns the posts loaded so far and the cursor to the next page
pub struct ListingController {
    source: Arc<dyn ContentSource>,
    state: Mutex<ListingState>,
}

impl ListingController {
    /// Start from the first page of a listing query
    pub fn new(source: Arc<dyn ContentSource>, first_page: QueryPage) -> Self {
        let (posts, _) = normalize_batch(&first_page.results);
        let phase = if first_page.next_page.is_some() {
            Phase::Idle
        } else {
            Phase::Exhausted
        };

        Self {
            source,
            state: Mutex::new(ListingState {
                posts,
                cursor: first_page.next_page,
                phase,
            }),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn snapshot(&self) -> ListingSnapshot {
        let state = self.state();
        ListingSnapshot {
            posts: state.posts.clone(),
            has_more: state.phase != Phase::Exhausted && state.cursor.is_some(),
        }
    }

    /// Number of posts loaded so far
    pub fn len(&self) -> usize {
        self.state().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tear the listing down. A fetch still in flight is discarded when it lands.
    pub fn detach(&self) {
        self.state().phase = Phase::Detached;
    }

    /// Fetch the next page and append it.
    ///
    /// On error the posts and cursor are left untouched and the controller
    /// goes back to Idle, so calling again retries the same page.
    pub async fn load_more(&self) -> Result<LoadOutcome, FetchError> {
        let token = {
            let mut state = self.state();
            match state.phase {
                Phase::Loading => return Ok(LoadOutcome::InFlight),
                Phase::Exhausted => return Ok(LoadOutcome::Exhausted),
                Phase::Detached => return Ok(LoadOutcome::Detached),
                Phase::Idle => {}
            }
            let Some(token) = state.cursor.clone() else {
                state.phase = Phase::Exhausted;
                return Ok(LoadOutcome::Exhausted);
            };
            state.phase = Phase::Loading;
            token
        };

        let mut guard = LoadingGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.source.fetch_page(&token).await;
        guard.armed = false;

        let mut state = self.state();
        if state.phase == Phase::Detached {
            tracing::debug!("Discarding page loaded after the listing was detached");
            return Ok(LoadOutcome::Detached);
        }

        match result {
            Ok(page) => {
                let (posts, rejected) = normalize_batch(&page.results);
                let added = posts.len();
                state.posts.extend(posts);
                state.phase = if page.next_page.is_some() {
                    Phase::Idle
                } else {
                    Phase::Exhausted
                };
                state.cursor = page.next_page;

                tracing::debug!(
                    "Loaded {} posts ({} rejected), {} total",
                    added,
                    rejected.len(),
                    state.posts.len()
                );
                Ok(LoadOutcome::Appended {
                    added,
                    rejected: rejected.len(),
                })
            }
            Err(e) => {
                state.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    /// `load_more`, retrying transient failures up to `retries` times
    pub async fn load_more_with_retry(
        &self,
        retries: usize,
        delay: Duration,
    ) -> Result<LoadOutcome, FetchError> {
        retry_transient(retries, delay, move || self.load_more()).await
    }

    /// Keep loading until the listing is exhausted. Returns the number of
    /// pages appended.
    pub async fn load_all(&self, retries: usize, delay: Duration) -> Result<usize, FetchError> {
        let mut pages = 0;
        while let LoadOutcome::Appended { .. } = self.load_more_with_retry(retries, delay).await? {
            pages += 1;
        }
        Ok(pages)
    }

    fn state(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Puts a Loading controller back to Idle if the load future is dropped
/// before the response arrives.
struct LoadingGuard<'a> {
    state: &'a Mutex<ListingState>,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.phase == Phase::Loading {
            state.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RawDocument;
    use crate::source::{QueryOptions, QueryPage};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    fn raw(uid: &str) -> RawDocument {
        serde_json::from_value(json!({
            "id": uid,
            "uid": uid,
            "type": "posts",
            "first_publication_date": "2021-01-01T00:00:00+0000",
            "data": { "title": uid, "content": [] }
        }))
        .unwrap()
    }

    fn page(uids: &[&str], next: Option<&str>) -> QueryPage {
        QueryPage {
            results: uids.iter().map(|u| raw(u)).collect(),
            next_page: next.map(PageToken::new),
        }
    }

    /// Replays canned responses and records the tokens it was asked for
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<QueryPage, FetchError>>>,
        tokens: Mutex<Vec<String>>,
        gate: Option<(Notify, Notify)>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<QueryPage, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        /// Each fetch signals `started` then waits for `release`
        fn gated(responses: Vec<Result<QueryPage, FetchError>>) -> Self {
            Self {
                gate: Some((Notify::new(), Notify::new())),
                ..Self::new(responses)
            }
        }

        fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }

        async fn started(&self) {
            self.gate.as_ref().unwrap().0.notified().await;
        }

        fn release(&self) {
            self.gate.as_ref().unwrap().1.notify_one();
        }
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        async fn query_by_type(
            &self,
            _doc_type: &str,
            _options: &QueryOptions,
        ) -> Result<QueryPage, FetchError> {
            unreachable!("the controller only follows tokens")
        }

        async fn fetch_page(&self, token: &PageToken) -> Result<QueryPage, FetchError> {
            self.tokens.lock().unwrap().push(token.as_str().to_string());
            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.notified().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch")
        }

        async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> Result<RawDocument, FetchError> {
            Ok(raw(uid))
        }
    }

    fn outage() -> FetchError {
        FetchError::Status {
            status: 503,
            url: "https://example.cdn.prismic.io/api/v2/documents/search".to_string(),
        }
    }

    fn uids(controller: &ListingController) -> Vec<String> {
        controller
            .snapshot()
            .posts
            .into_iter()
            .map(|p| p.uid)
            .collect()
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(page(&["p2"], None))]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));
        assert!(controller.snapshot().has_more);

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { added: 1, rejected: 0 });
        assert_eq!(uids(&controller), vec!["p1", "p2"]);
        assert!(!controller.snapshot().has_more);
        assert_eq!(controller.phase(), Phase::Exhausted);

        // No further request once exhausted
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(source.tokens(), vec!["tok1"]);
        assert_eq!(uids(&controller), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_pages_append_in_call_order() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&["c", "d"], Some("t2"))),
            Ok(page(&["e"], Some("t3"))),
            Ok(page(&["f", "g"], None)),
        ]));
        let controller = ListingController::new(source.clone(), page(&["a", "b"], Some("t1")));

        while controller.snapshot().has_more {
            controller.load_more().await.unwrap();
        }

        assert_eq!(uids(&controller), vec!["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(source.tokens(), vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_first_page_without_token_is_exhausted() {
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let controller = ListingController::new(source.clone(), page(&["only"], None));

        assert_eq!(controller.phase(), Phase::Exhausted);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert!(source.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_state_and_retries_same_token() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(outage()),
            Ok(page(&["p2"], None)),
        ]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));

        let err = controller.load_more().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(uids(&controller), vec!["p1"]);
        assert!(controller.snapshot().has_more);

        controller.load_more().await.unwrap();
        assert_eq!(uids(&controller), vec!["p1", "p2"]);
        assert_eq!(source.tokens(), vec!["tok1", "tok1"]);
    }

    #[tokio::test]
    async fn test_load_more_with_retry() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(outage()),
            Err(outage()),
            Ok(page(&["p2"], None)),
        ]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));

        let outcome = controller
            .load_more_with_retry(3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { added: 1, rejected: 0 });
        assert_eq!(source.tokens().len(), 3);
    }

    #[tokio::test]
    async fn test_load_all() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(page(&["p2"], Some("tok2"))),
            Err(outage()),
            Ok(page(&["p3"], None)),
        ]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));

        let pages = controller
            .load_all(1, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(pages, 2);
        assert_eq!(uids(&controller), vec!["p1", "p2", "p3"]);
        assert_eq!(source.tokens(), vec!["tok1", "tok2", "tok2"]);
        assert_eq!(controller.phase(), Phase::Exhausted);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let source = Arc::new(ScriptedSource::new(vec![Err(FetchError::InvalidToken(
            "tok1".to_string(),
        ))]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));

        let err = controller
            .load_more_with_retry(3, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidToken(_)));
        assert_eq!(source.tokens().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_load_is_dropped() {
        let source = Arc::new(ScriptedSource::gated(vec![Ok(page(&["p2"], Some("tok2")))]));
        let controller = Arc::new(ListingController::new(
            source.clone(),
            page(&["p1"], Some("tok1")),
        ));

        let background = controller.clone();
        let first = tokio::spawn(async move { background.load_more().await });
        source.started().await;

        assert_eq!(controller.phase(), Phase::Loading);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::InFlight);

        source.release();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { added: 1, rejected: 0 });
        assert_eq!(uids(&controller), vec!["p1", "p2"]);
        assert_eq!(source.tokens(), vec!["tok1"]);
        assert_eq!(controller.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_response_after_detach_is_discarded() {
        let source = Arc::new(ScriptedSource::gated(vec![Ok(page(&["p2"], None))]));
        let controller = Arc::new(ListingController::new(
            source.clone(),
            page(&["p1"], Some("tok1")),
        ));

        let background = controller.clone();
        let pending = tokio::spawn(async move { background.load_more().await });
        source.started().await;

        controller.detach();
        source.release();

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Detached);
        assert_eq!(uids(&controller), vec!["p1"]);
        assert_eq!(controller.phase(), Phase::Detached);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Detached);
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let mut broken = raw("broken");
        broken.data = json!({ "title": "no content" });
        let next = QueryPage {
            results: vec![raw("p2"), broken, raw("p3")],
            next_page: None,
        };
        let source = Arc::new(ScriptedSource::new(vec![Ok(next)]));
        let controller = ListingController::new(source, page(&["p1"], Some("tok1")));

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { added: 2, rejected: 1 });
        assert_eq!(uids(&controller), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_unparseable_date_rejects_only_that_post() {
        let mut bad = raw("bad-date");
        bad.first_publication_date = Some("15/03/2021".to_string());
        let next = QueryPage {
            results: vec![raw("good"), bad],
            next_page: None,
        };
        let source = Arc::new(ScriptedSource::new(vec![Ok(next)]));
        let controller = ListingController::new(source, page(&["p1"], Some("tok1")));

        let outcome = controller.load_more().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Appended { added: 1, rejected: 1 });
        assert_eq!(uids(&controller), vec!["p1", "good"]);
        assert_eq!(controller.phase(), Phase::Exhausted);
    }

    #[tokio::test]
    async fn test_dropped_load_returns_to_idle() {
        let source = Arc::new(ScriptedSource::gated(vec![Ok(page(&["p2"], None))]));
        let controller = ListingController::new(source.clone(), page(&["p1"], Some("tok1")));

        {
            let load = controller.load_more();
            tokio::pin!(load);
            tokio::select! {
                _ = &mut load => unreachable!("fetch is gated"),
                _ = source.started() => {}
            }
        }

        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(uids(&controller), vec!["p1"]);
    }
}
