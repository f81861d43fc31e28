//! Remote page fetching.
//!
//! ### URL Resolution
//! - Relative endpoints are joined below `domain` and `api_path`
//! - Absolute `http(s)://` endpoints bypass the prefix
//!
//! ### Transport
//! - `get`: `GET <endpoint>?page=N`
//! - `post`: `POST <endpoint>` with `{model, api_key, page}` as JSON body
//!
//! A fixed 10s timeout applies to every request. Failures are never retried
//! here; the ingest pipeline treats any failure as fatal for the rebuild.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, endpoint_url};

use rmodels_core::{AppConfig, Entity, Error, Page, Transport};

/// Timeout applied to every page request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of remote pages for an entity.
///
/// The HTTP fetcher is the production implementation; the ingest pipeline
/// and resolver only depend on this trait.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one 1-based page of the entity's remote data.
    async fn fetch_page(&self, entity: &Entity, page: u64) -> Result<Page, Error>;
}

/// Configuration for the remote fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Remote domain; may omit the scheme (https is assumed).
    pub domain: String,

    /// Path prefix joined between domain and endpoint.
    pub api_path: String,

    pub transport: Transport,

    /// Shared secret sent in the POST body.
    pub api_key: Option<String>,

    /// User agent string (default: "remote-models/0.1")
    pub user_agent: String,

    /// Request timeout (default: 10s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            api_path: config.api_path.clone(),
            transport: config.transport,
            api_key: config.api_key.clone(),
            user_agent: config.user_agent.clone(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Body of a POST page request, also accepted by hosts serving pages outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub model: String,
    pub api_key: Option<String>,
    pub page: u64,
}

/// HTTP fetcher for remote pages.
pub struct RemoteFetcher {
    http: Client,
    config: FetchConfig,
}

impl RemoteFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::RemoteUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Full URL of an entity's endpoint.
    ///
    /// A relative endpoint with no domain configured has no remote to reach,
    /// so it fails like any other unreachable remote.
    pub fn url_for(&self, entity: &Entity) -> Result<reqwest::Url, Error> {
        endpoint_url(&self.config.domain, &self.config.api_path, &entity.endpoint()).map_err(|e| match e {
            UrlError::NoDomain(_) => {
                Error::RemoteUnavailable(format!("access to remote model `{}` failed: {e}", entity.name()))
            }
            other => Error::InvalidUrl(other.to_string()),
        })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn request(&self, entity: &Entity, page: u64) -> Result<Page, Error> {
        let start = Instant::now();
        let mut url = self.url_for(entity)?;

        let request = match self.config.transport {
            Transport::Get => {
                url.query_pairs_mut().append_pair("page", &page.to_string());
                self.http.get(url.clone())
            }
            Transport::Post => self.http.post(url.clone()).json(&PageRequest {
                model: entity.name().to_string(),
                api_key: self.config.api_key.clone(),
                page,
            }),
        };

        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("access to remote model `{}` failed: {e}", entity.name())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!(
                "access to remote model `{}` failed: status {}",
                entity.name(),
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("failed to read response: {e}")))?;

        let page_result: Page = serde_json::from_slice(&bytes).map_err(|e| {
            Error::RemoteUnavailable(format!("malformed response from remote model `{}`: {e}", entity.name()))
        })?;

        tracing::debug!(
            entity = entity.name(),
            %url,
            page,
            records = page_result.records().len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched remote page"
        );

        Ok(page_result)
    }
}

#[async_trait]
impl PageSource for RemoteFetcher {
    async fn fetch_page(&self, entity: &Entity, page: u64) -> Result<Page, Error> {
        self.request(entity, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::respond_once;

    fn fetcher(domain: &str, transport: Transport) -> RemoteFetcher {
        let config = FetchConfig {
            domain: domain.to_string(),
            api_path: "/api/_remote/_models".into(),
            transport,
            api_key: Some("secret".into()),
            ..Default::default()
        };
        RemoteFetcher::new(config).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "remote-models/0.1");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.transport, Transport::Get);
    }

    #[test]
    fn test_url_for_entity() {
        let fetcher = fetcher("https://yourdomain.com/", Transport::Get);
        let url = fetcher.url_for(&Entity::new("CelebrityWithSchema")).unwrap();
        assert_eq!(url.as_str(), "https://yourdomain.com/api/_remote/_models/celebrity-with-schema");

        let custom = Entity::new("Celebrity").with_endpoint("https://elsewhere.test/people");
        assert_eq!(fetcher.url_for(&custom).unwrap().as_str(), "https://elsewhere.test/people");
    }

    #[test]
    fn test_url_for_without_domain() {
        let fetcher = fetcher("", Transport::Get);
        assert!(matches!(fetcher.url_for(&Entity::new("Celebrity")), Err(Error::RemoteUnavailable(_))));

        let absolute = Entity::new("Celebrity").with_endpoint("https://elsewhere.test/people");
        assert!(fetcher.url_for(&absolute).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_without_domain_is_remote_unavailable() {
        let result = fetcher("", Transport::Get).fetch_page(&Entity::new("Celebrity"), 1).await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(msg)) if msg.contains("Celebrity")));
    }

    #[tokio::test]
    async fn test_get_sends_page_query() {
        let body = r#"{"current_page":2,"last_page":3,"per_page":1,"data":[{"id":1,"name":"The Rock"}]}"#;
        let (base, server) = respond_once(200, body).await;

        let page = fetcher(&base, Transport::Get)
            .fetch_page(&Entity::new("Celebrity"), 2)
            .await
            .unwrap();
        assert_eq!(page.records().len(), 1);
        assert_eq!(page.next_page(), Some(3));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/_remote/_models/celebrity?page=2 "));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let (base, server) = respond_once(200, r#"[{"id":1}]"#).await;

        let page = fetcher(&base, Transport::Post)
            .fetch_page(&Entity::new("Celebrity"), 1)
            .await
            .unwrap();
        assert!(matches!(page, Page::Bare(ref records) if records.len() == 1));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/_remote/_models/celebrity "));
        assert!(request.contains(r#""model":"Celebrity""#));
        assert!(request.contains(r#""api_key":"secret""#));
        assert!(request.contains(r#""page":1"#));
    }

    #[tokio::test]
    async fn test_server_error_is_remote_unavailable() {
        let (base, _server) = respond_once(500, r#"{"message":"boom"}"#).await;
        let result = fetcher(&base, Transport::Get).fetch_page(&Entity::new("Celebrity"), 1).await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(msg)) if msg.contains("status 500")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_remote_unavailable() {
        let (base, _server) = respond_once(200, "<html>not json</html>").await;
        let result = fetcher(&base, Transport::Get).fetch_page(&Entity::new("Celebrity"), 1).await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(msg)) if msg.contains("malformed")));
    }

    #[tokio::test]
    async fn test_connection_refused_is_remote_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = fetcher(&format!("http://{addr}"), Transport::Get)
            .fetch_page(&Entity::new("Celebrity"), 1)
            .await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(_))));
    }
}
