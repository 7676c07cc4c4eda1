use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Fetch, FetchResponse};
use crate::cache::Cache;
use crate::config::Config;
use crate::error::{Error, Result};

/// [`Fetch`] over HTTP with a transparent response cache.
///
/// Requests are never retried; a transport failure goes straight back to
/// the caller.
pub struct HttpFetcher {
    client: Client,
    cache: Arc<Cache>,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(client: Client, cache: Arc<Cache>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            user_agent: user_agent.into(),
        }
    }

    /// Builds the reqwest client and cache described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let client = builder.build()?;

        let cache = match config.effective_cache_dir() {
            Some(dir) => Cache::with_dir(dir),
            None => Cache::in_memory(),
        };

        Ok(Self::new(client, Arc::new(cache), config.user_agent.clone()))
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch_json(&self, url: &str) -> Result<FetchResponse> {
        if let Some(hit) = self.cache.get::<FetchResponse>(url).await {
            debug!("Cache hit for {}", url);
            return Ok(hit);
        }
        debug!("Cache miss, GET {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        let body = if status.is_success() {
            let value = serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                url: url.to_string(),
                source,
            })?;
            Some(value)
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        let fetched = FetchResponse::new(status.as_u16(), body);
        if fetched.is_cacheable() {
            if let Err(e) = self.cache.set(url, &fetched).await {
                warn!("Failed to persist cached response for {}: {}", url, e);
            }
        }

        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Client::new(), Arc::new(Cache::in_memory()), "mwsite-test")
    }

    #[tokio::test]
    async fn test_fetch_json_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/packages")
            .match_header("user-agent", "mwsite-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "logger"}]"#)
            .create_async()
            .await;

        let response = fetcher()
            .fetch_json(&format!("{}/packages", url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body,
            Some(serde_json::json!([{ "name": "logger" }]))
        );
    }

    #[tokio::test]
    async fn test_identical_url_hits_cache() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/@scope/logger", server.url());

        let mock = server
            .mock("GET", "/@scope/logger")
            .with_status(200)
            .with_body(r#"{"name": "logger"}"#)
            .expect(1)
            .create_async()
            .await;

        let fetcher = fetcher();
        let first = fetcher.fetch_json(&url).await.unwrap();
        let second = fetcher.fetch_json(&url).await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(fetcher.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached_with_lenient_body() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/@scope/unknown-pkg", server.url());

        let mock = server
            .mock("GET", "/@scope/unknown-pkg")
            .with_status(404)
            .with_body("Not Found")
            .expect(1)
            .create_async()
            .await;

        let fetcher = fetcher();
        let response = fetcher.fetch_json(&url).await.unwrap();
        assert!(response.is_not_found());
        assert_eq!(response.body, None);

        fetcher.fetch_json(&url).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/packages", server.url());

        let mock = server
            .mock("GET", "/packages")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher();
        assert_eq!(fetcher.fetch_json(&url).await.unwrap().status, 503);
        assert_eq!(fetcher.fetch_json(&url).await.unwrap().status, 503);
        mock.assert_async().await;
        assert!(fetcher.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let url = format!("{}/packages", server.url());

        let _mock = server
            .mock("GET", "/packages")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = fetcher().fetch_json(&url).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.is_upstream_failure());
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out_as_http_error() {
        let url = crate::registry::stub::stalled_upstream().await;
        let config = Config {
            request_timeout_secs: 1,
            disk_cache: false,
            ..Config::default()
        };
        let fetcher = HttpFetcher::from_config(&config).unwrap();

        let started = std::time::Instant::now();
        let err = fetcher.fetch_json(&url).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match &err {
            Error::Http(e) => assert!(e.is_timeout(), "{}", e),
            other => panic!("expected a transport error, got {}", other),
        }
        assert!(err.is_upstream_failure());
        assert!(fetcher.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        let err = fetcher()
            .fetch_json("http://127.0.0.1:1/unreachable")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
