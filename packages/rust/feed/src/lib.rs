//! Goodreads `review/list` feed access: fetching, XML decoding, normalization.
//!
//! This crate provides:
//! - [`xml`]: a schema-free XML → tree decoder
//! - [`FeedPage`]: one decoded page with its `end` / `total` counters
//! - [`normalize_entry`]: entry → [`Review`](bookshelf_shared::Review) + [`Book`](bookshelf_shared::Book)
//! - [`FeedSource`] / [`FeedClient`]: the "fetch page N" capability over HTTP

pub mod normalize;
pub mod page;
pub mod xml;

use std::future::Future;
use std::time::Duration;

use bookshelf_shared::{BookshelfError, Result, SyncSettings};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

pub use normalize::{NormalizedEntry, normalize_entry, parse_feed_date};
pub use page::{FeedPage, RawEntry};
pub use xml::{XmlDocument, XmlNode, decode};

/// Maximum number of redirects to follow per page request.
const MAX_REDIRECTS: usize = 3;

/// Default per-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("Bookshelf/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// PageRequest / FeedSource
// ---------------------------------------------------------------------------

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<'a> {
    pub user_id: &'a str,
    pub shelf: &'a str,
    pub api_key: &'a str,
    /// 1-based page number.
    pub page: u32,
}

/// Anything that can return the raw XML payload of a feed page.
pub trait FeedSource {
    /// Fetch one page, failing with a fetch error on transport failure or a
    /// non-success status.
    fn fetch_page(&self, request: &PageRequest<'_>) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// FeedClient
// ---------------------------------------------------------------------------

/// HTTP implementation of [`FeedSource`] against the Goodreads API.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    endpoint: Url,
}

/// Configuration for a [`FeedClient`].
#[derive(Debug, Clone)]
pub struct FeedClientOptions {
    /// Base URL, e.g. `https://www.goodreads.com`.
    pub endpoint: String,
    /// Timeout for each page request in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedClientOptions {
    fn default() -> Self {
        Self {
            endpoint: "https://www.goodreads.com".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl From<&SyncSettings> for FeedClientOptions {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}

impl FeedClient {
    /// Build a client for the given endpoint.
    pub fn new(opts: &FeedClientOptions) -> Result<Self> {
        let endpoint = Url::parse(&opts.endpoint).map_err(|e| {
            BookshelfError::config(format!("invalid endpoint '{}': {e}", opts.endpoint))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| BookshelfError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    /// The list URL for `request`:
    /// `{endpoint}/review/list/{user}.xml?key=..&v=2&page=..&shelf=..`.
    pub fn page_url(&self, request: &PageRequest<'_>) -> Result<Url> {
        let file = format!("{}.xml", request.user_id);
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BookshelfError::config(format!("endpoint cannot be a base URL: {}", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["review", "list", file.as_str()]);

        url.query_pairs_mut()
            .append_pair("key", request.api_key)
            .append_pair("v", "2")
            .append_pair("page", &request.page.to_string())
            .append_pair("shelf", request.shelf);

        Ok(url)
    }
}

impl FeedSource for FeedClient {
    #[instrument(skip_all, fields(user_id = %request.user_id, page = request.page))]
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<String> {
        let url = self.page_url(request)?;
        // The key is a credential; keep it out of logs and errors.
        let shown = redact_key(&url);
        debug!(url = %shown, "fetching feed page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BookshelfError::Fetch(format!("{shown}: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BookshelfError::Fetch(format!("{shown}: HTTP {status}")));
        }

        response.text().await.map_err(|e| {
            BookshelfError::Fetch(format!("{shown}: failed to read body: {}", e.without_url()))
        })
    }
}

/// Copy of `url` with the `key` query parameter masked.
fn redact_key(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" && !v.is_empty() {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_shared::ErrorKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(page: u32) -> PageRequest<'static> {
        PageRequest {
            user_id: "4242",
            shelf: "read",
            api_key: "secret",
            page,
        }
    }

    fn client_for(server: &MockServer) -> FeedClient {
        FeedClient::new(&FeedClientOptions {
            endpoint: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn builds_list_url() {
        let client = FeedClient::new(&FeedClientOptions::default()).unwrap();
        let url = client.page_url(&request(3)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.goodreads.com/review/list/4242.xml?key=secret&v=2&page=3&shelf=read"
        );
    }

    #[test]
    fn redacts_key() {
        let client = FeedClient::new(&FeedClientOptions::default()).unwrap();
        let url = client.page_url(&request(1)).unwrap();
        let shown = redact_key(&url);
        assert!(!shown.as_str().contains("secret"));
        assert!(shown.as_str().contains("page=1"));
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let err = FeedClient::new(&FeedClientOptions {
            endpoint: "not a url".into(),
            timeout_secs: 5,
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn fetches_page_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/review/list/4242.xml"))
            .and(query_param("key", "secret"))
            .and(query_param("v", "2"))
            .and(query_param("page", "2"))
            .and(query_param("shelf", "read"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<GoodreadsResponse/>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).fetch_page(&request(2)).await.unwrap();
        assert_eq!(body, "<GoodreadsResponse/>");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_page(&request(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("401"));
        assert!(!err.to_string().contains("secret"));
    }
}
