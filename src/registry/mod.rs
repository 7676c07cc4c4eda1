//! Upstream lookups against the contents listing and the package registry.
//!
//! [`Fetch`] is the transport seam: [`HttpFetcher`] issues real requests
//! through a [`Cache`](crate::Cache), tests substitute an in-memory stub.
//! [`RegistryClient`] turns raw responses into typed payloads.

mod http;

pub use http::HttpFetcher;

use crate::error::{Error, Result};
use crate::model::{PackageRecord, PackageSummary};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Status and parsed body of an upstream GET.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl FetchResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Successful and not-found responses are stable enough to cache;
    /// anything else (rate limits, server errors) is retried next request.
    pub fn is_cacheable(&self) -> bool {
        self.is_success() || self.is_not_found()
    }
}

#[async_trait]
pub trait Fetch: Send + Sync {
    /// GETs `url` and parses the body as JSON.
    ///
    /// A 2xx body that is not JSON is an error; for other statuses the body
    /// is `None` when it does not parse.
    async fn fetch_json(&self, url: &str) -> Result<FetchResponse>;
}

/// Typed access to the two upstream services.
#[derive(Clone)]
pub struct RegistryClient {
    fetcher: Arc<dyn Fetch>,
    listing_url: String,
    registry_url: String,
}

impl RegistryClient {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        listing_url: impl Into<String>,
        registry_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            listing_url: listing_url.into(),
            registry_url: registry_url.into(),
        }
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    /// URL of a package's registry record.
    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.registry_url.trim_end_matches('/'), name)
    }

    /// Fetches the full, unfiltered plugin directory listing.
    #[tracing::instrument(skip(self))]
    pub async fn listing(&self) -> Result<Vec<PackageSummary>> {
        let response = self.fetcher.fetch_json(&self.listing_url).await?;
        if !response.is_success() {
            return Err(Error::UpstreamStatus {
                url: self.listing_url.clone(),
                status: response.status,
            });
        }

        let listing: Vec<PackageSummary> = decode(&self.listing_url, response.body)?;
        debug!("Listing returned {} entries", listing.len());
        Ok(listing)
    }

    /// Fetches a package record. `Ok(None)` means the registry answered 404.
    #[tracing::instrument(skip(self))]
    pub async fn package(&self, name: &str) -> Result<Option<PackageRecord>> {
        let url = self.package_url(name);
        let response = self.fetcher.fetch_json(&url).await?;

        if response.is_not_found() {
            debug!("Registry has no package {}", name);
            return Ok(None);
        }
        if !response.is_success() {
            return Err(Error::UpstreamStatus {
                url,
                status: response.status,
            });
        }

        decode(&url, response.body).map(Some)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: Option<serde_json::Value>) -> Result<T> {
    serde_json::from_value(body.unwrap_or(serde_json::Value::Null)).map_err(|source| {
        Error::Decode {
            url: url.to_string(),
            source,
        }
    })
}

/// In-memory [`Fetch`] used by tests across the crate.
#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct StubFetcher {
        responses: HashMap<String, FetchResponse>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(mut self, url: &str, status: u16, body: serde_json::Value) -> Self {
            self.responses
                .insert(url.to_string(), FetchResponse::new(status, Some(body)));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    /// Binds a local port that accepts connections and never answers.
    /// Returns its base URL.
    pub async fn stalled_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch_json(&self, url: &str) -> Result<FetchResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(response) => Ok(response.clone()),
                None => Err(Error::UpstreamStatus {
                    url: url.to_string(),
                    status: 502,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubFetcher;
    use super::*;
    use serde_json::json;

    const LISTING: &str = "https://api.example/contents/packages";
    const REGISTRY: &str = "https://registry.example/@scope";

    fn client(stub: StubFetcher) -> (RegistryClient, Arc<StubFetcher>) {
        let stub = Arc::new(stub);
        (RegistryClient::new(stub.clone(), LISTING, REGISTRY), stub)
    }

    #[test]
    fn test_package_url() {
        let (client, _) = client(StubFetcher::new());
        assert_eq!(client.package_url("logger"), "https://registry.example/@scope/logger");

        let trailing = RegistryClient::new(Arc::new(StubFetcher::new()), LISTING, "https://r/@s/");
        assert_eq!(trailing.package_url("x"), "https://r/@s/x");
    }

    #[test]
    fn test_fetch_response_classification() {
        assert!(FetchResponse::new(200, None).is_cacheable());
        assert!(FetchResponse::new(404, None).is_cacheable());
        assert!(!FetchResponse::new(403, None).is_cacheable());
        assert!(!FetchResponse::new(503, None).is_success());
    }

    #[tokio::test]
    async fn test_listing_decodes_entries() {
        let (client, stub) = client(StubFetcher::new().respond(
            LISTING,
            200,
            json!([{ "name": "logger", "type": "dir" }, { "name": "etag" }]),
        ));

        let listing = client.listing().await.unwrap();
        let names: Vec<&str> = listing.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["logger", "etag"]);
        assert_eq!(stub.calls(), vec![LISTING.to_string()]);
    }

    #[tokio::test]
    async fn test_listing_wrong_shape_is_decode_error() {
        let (client, _) = client(StubFetcher::new().respond(
            LISTING,
            200,
            json!({ "message": "API rate limit exceeded" }),
        ));
        let err = client.listing().await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_listing_error_status() {
        let (client, _) = client(StubFetcher::new().respond(LISTING, 403, json!({})));
        let err = client.listing().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_package_not_found() {
        let url = format!("{}/unknown-pkg", REGISTRY);
        let (client, _) = client(StubFetcher::new().respond(&url, 404, json!({ "error": "Not found" })));
        assert!(client.package("unknown-pkg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_package_record() {
        let url = format!("{}/logger", REGISTRY);
        let (client, _) = client(StubFetcher::new().respond(
            &url,
            200,
            json!({
                "name": "@scope/logger",
                "dist-tags": { "latest": "0.1.0" },
                "versions": { "0.1.0": {} }
            }),
        ));
        let record = client.package("logger").await.unwrap().unwrap();
        assert_eq!(record.dist_tags.latest, "0.1.0");
        assert_eq!(record.readme, None);
    }

    #[tokio::test]
    async fn test_package_missing_dist_tags() {
        let url = format!("{}/logger", REGISTRY);
        let (client, _) = client(StubFetcher::new().respond(&url, 200, json!({ "name": "x" })));
        let err = client.package("logger").await.unwrap_err();
        assert!(err.is_upstream_failure());
    }
}
