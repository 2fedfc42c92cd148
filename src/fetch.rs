use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cache::PageCache;
use crate::config::Config;
use crate::models::{AppId, WishlistPage};

/// Downloads a source account's wishlist through the public paginated
/// wishlist-data endpoint.
pub struct WishlistClient {
    client: reqwest::Client,
    config: Config,
}

impl WishlistClient {
    pub fn new(config: Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(crate::config::USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetches every wishlist page for `user_id`, persisting each page
    /// to the cache and merging its keys into one snapshot.
    ///
    /// Returns the app ids in first-seen order. Pagination ends on the
    /// first empty page; a transport or parse failure ends it early with
    /// whatever has been accumulated so far (partial result, not an
    /// error). An empty page 0 yields an empty list.
    pub async fn fetch(&self, user_id: &str, cache: &PageCache) -> Result<Vec<AppId>> {
        info!(user_id, "downloading wishlist");

        let mut snapshot: Map<String, Value> = Map::new();
        let mut index = 0;

        loop {
            info!(page = index, "downloading wishlist page");

            let body = match self.fetch_page(user_id, index).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(page = index, error = %err, "wishlist page request failed, keeping partial result");
                    break;
                }
            };

            let page = match parse_page(index, &body) {
                Ok(page) => page,
                Err(err) => {
                    warn!(page = index, error = %err, "unexpected wishlist page body, keeping partial result");
                    break;
                }
            };

            // An empty object is the endpoint's end-of-pagination signal.
            if page.items.is_empty() {
                break;
            }

            cache.store(page.index, &body)?;
            for (app_id, metadata) in page.items {
                snapshot.insert(app_id, metadata);
            }

            index += 1;
            sleep(self.config.page_delay).await;
        }

        info!(pages = index, games = snapshot.len(), "wishlist download finished");
        Ok(snapshot.keys().cloned().collect())
    }

    async fn fetch_page(&self, user_id: &str, page: usize) -> Result<String> {
        let url = self.config.wishlist_url(user_id, page);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Wishlist endpoint returned {status}"));
        }

        Ok(response.text().await?)
    }
}

/// Parses one raw response body into a page, rejecting anything that is
/// not a JSON object.
fn parse_page(index: usize, body: &str) -> Result<WishlistPage> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(items) => Ok(WishlistPage { index, items }),
        _ => Err(anyhow::anyhow!("Expected a JSON object in the page body")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn test_config(store_base: String, cache_dir: std::path::PathBuf) -> Config {
        Config {
            store_base,
            request_timeout: Duration::from_secs(5),
            page_delay: Duration::ZERO,
            add_delay: Duration::ZERO,
            recovery_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            gate_wait: Duration::ZERO,
            element_wait: Duration::ZERO,
            cache_dir,
        }
    }

    fn wishlist_path(user: &str) -> String {
        format!("/wishlist/id/{user}/wishlistdata/")
    }

    async fn mock_page<'a>(
        server: &'a MockServer,
        user: &str,
        page: usize,
        body: &str,
    ) -> httpmock::Mock<'a> {
        let path = wishlist_path(user);
        let body = body.to_string();
        server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path(path)
                    .query_param("p", page.to_string());
                then.status(200)
                    .header("content-type", "application/json")
                    .body(body);
            })
            .await
    }

    #[tokio::test]
    async fn collects_all_pages_in_first_seen_order() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        let p0 = mock_page(&server, "alice", 0, r#"{"10":{},"20":{}}"#).await;
        let p1 = mock_page(&server, "alice", 1, r#"{"30":{}}"#).await;
        let p2 = mock_page(&server, "alice", 2, "{}").await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let ids = client.fetch("alice", &cache).await.unwrap();

        assert_eq!(ids, vec!["10", "20", "30"]);
        assert_eq!(p0.hits_async().await, 1);
        assert_eq!(p1.hits_async().await, 1);
        // The empty page is requested exactly once to detect the end.
        assert_eq!(p2.hits_async().await, 1);
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_list_after_one_request() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        let p0 = mock_page(&server, "bob", 0, "{}").await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let ids = client.fetch("bob", &cache).await.unwrap();

        assert!(ids.is_empty());
        assert_eq!(p0.hits_async().await, 1);
        // Nothing gets cached for an empty wishlist.
        assert!(!cache.dir().join("wishlist0.json").exists());
    }

    #[tokio::test]
    async fn transport_failure_returns_partial_result() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        mock_page(&server, "carol", 0, r#"{"10":{},"20":{}}"#).await;
        let p1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(wishlist_path("carol"))
                    .query_param("p", "1");
                then.status(500);
            })
            .await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let ids = client.fetch("carol", &cache).await.unwrap();

        assert_eq!(ids, vec!["10", "20"]);
        assert_eq!(p1.hits_async().await, 1);
    }

    #[tokio::test]
    async fn unparseable_body_ends_pagination_with_partial_result() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        mock_page(&server, "dave", 0, r#"{"10":{}}"#).await;
        mock_page(&server, "dave", 1, "not json at all").await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let ids = client.fetch("dave", &cache).await.unwrap();

        assert_eq!(ids, vec!["10"]);
    }

    #[tokio::test]
    async fn non_object_body_is_treated_like_a_transport_error() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        mock_page(&server, "erin", 0, r#"["10","20"]"#).await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let ids = client.fetch("erin", &cache).await.unwrap();

        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn fetching_twice_is_idempotent() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        mock_page(&server, "frank", 0, r#"{"42":{},"7":{}}"#).await;
        mock_page(&server, "frank", 1, "{}").await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        let first = client.fetch("frank", &cache).await.unwrap();
        let second = client.fetch("frank", &cache).await.unwrap();

        assert_eq!(first, vec!["42", "7"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn persists_each_page_verbatim() {
        let server = MockServer::start_async().await;
        let tmp = tempfile::tempdir().unwrap();
        mock_page(&server, "grace", 0, r#"{"10":{"name":"A"}}"#).await;
        mock_page(&server, "grace", 1, "{}").await;

        let config = test_config(server.base_url(), tmp.path().to_path_buf());
        let cache = PageCache::create(&config.cache_dir).unwrap();
        let client = WishlistClient::new(config).unwrap();

        client.fetch("grace", &cache).await.unwrap();

        let cached = std::fs::read_to_string(cache.dir().join("wishlist0.json")).unwrap();
        assert_eq!(cached, r#"{"10":{"name":"A"}}"#);
    }
}
