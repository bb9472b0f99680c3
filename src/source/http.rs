//! Content source over the Prismic REST API (v2)

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::{ContentSource, FetchError, Ordering, PageToken, QueryOptions, QueryPage};
use crate::content::{decode_documents, RawDocument};

/// Connection settings for [`HttpSource`]
#[derive(Debug, Clone)]
pub struct HttpSourceSettings {
    /// API root, e.g. https://my-repo.cdn.prismic.io/api/v2
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Release or preview ref; the master ref is looked up when unset
    pub release_ref: Option<String>,
    pub request_timeout: Duration,
}

impl HttpSourceSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token: None,
            release_ref: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    // Decoded per document, so one bad entry cannot fail the page
    results: Vec<serde_json::Value>,
    #[serde(default)]
    next_page: Option<String>,
}

/// Reads documents from a Prismic repository
pub struct HttpSource {
    client: reqwest::Client,
    settings: HttpSourceSettings,
    master_ref: OnceCell<String>,
}

impl HttpSource {
    pub fn new(settings: HttpSourceSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            settings,
            master_ref: OnceCell::new(),
        })
    }

    /// The ref every query is pinned to
    async fn content_ref(&self) -> Result<String, FetchError> {
        if let Some(release) = &self.settings.release_ref {
            return Ok(release.clone());
        }

        let master = self
            .master_ref
            .get_or_try_init(|| async {
                let mut request = self.client.get(&self.settings.endpoint);
                if let Some(token) = &self.settings.access_token {
                    request = request.query(&[("access_token", token)]);
                }
                let info: ApiInfo = self.send(request).await?;
                info.refs
                    .into_iter()
                    .find(|r| r.is_master_ref)
                    .map(|r| r.reference)
                    .ok_or_else(|| FetchError::Status {
                        status: 404,
                        url: format!("{} (master ref)", self.settings.endpoint),
                    })
            })
            .await?;

        Ok(master.clone())
    }

    async fn search(
        &self,
        predicates: &[String],
        options: &QueryOptions,
    ) -> Result<QueryPage, FetchError> {
        let content_ref = self.content_ref().await?;
        let direction = match options.ordering {
            Ordering::Ascending => "",
            Ordering::Descending => " desc",
        };

        let mut params = vec![
            ("ref", content_ref),
            ("q", format!("[{}]", predicates.concat())),
            ("pageSize", options.page_size.to_string()),
            (
                "orderings",
                format!("[document.first_publication_date{}]", direction),
            ),
        ];
        if let Some(token) = &self.settings.access_token {
            params.push(("access_token", token.clone()));
        }

        let url = format!("{}/documents/search", self.settings.endpoint);
        tracing::debug!("Querying {} with {:?}", url, predicates);
        let response: SearchResponse = self.send(self.client.get(&url).query(&params)).await?;
        Ok(into_page(response))
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn query_by_type(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryPage, FetchError> {
        let mut predicates = vec![format!(r#"[at(document.type,"{}")]"#, quote(doc_type))];
        if let Some(after) = options.published_after {
            predicates.push(format!(
                "[date.after(document.first_publication_date,{})]",
                after.timestamp_millis()
            ));
        }
        if let Some(before) = options.published_before {
            predicates.push(format!(
                "[date.before(document.first_publication_date,{})]",
                before.timestamp_millis()
            ));
        }
        self.search(&predicates, options).await
    }

    async fn fetch_page(&self, token: &PageToken) -> Result<QueryPage, FetchError> {
        // next_page URLs already carry ref, query and paging
        if !token.as_str().starts_with(&self.settings.endpoint) {
            return Err(FetchError::InvalidToken(token.as_str().to_string()));
        }
        let response: SearchResponse = self.send(self.client.get(token.as_str())).await?;
        Ok(into_page(response))
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawDocument, FetchError> {
        let predicates = vec![format!(r#"[at(my.{}.uid,"{}")]"#, doc_type, quote(uid))];
        let options = QueryOptions::default().page_size(1);
        let not_found = || FetchError::NotFound {
            doc_type: doc_type.to_string(),
            uid: uid.to_string(),
        };
        let page = match self.search(&predicates, &options).await {
            Err(FetchError::Status { status: 404, .. }) => return Err(not_found()),
            other => other?,
        };
        page.results.into_iter().next().ok_or_else(not_found)
    }
}

/// Escape a value for a double-quoted predicate argument
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn into_page(response: SearchResponse) -> QueryPage {
    QueryPage {
        results: decode_documents(response.results),
        next_page: response
            .next_page
            .filter(|url| !url.is_empty())
            .map(PageToken::new),
    }
}
