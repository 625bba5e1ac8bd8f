//! Feed retrieval over HTTP.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::settings::ScanningConfig;

/// Accept header advertised to feed servers.
const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";

/// Errors raised while fetching a feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport level failure (DNS, TLS, timeout, connection reset)
    #[error("request failed: {0}")]
    Request(String),

    #[error("rate limited by feed server")]
    RateLimited,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to configure HTTP client: {0}")]
    Client(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Anything that can produce the raw text of a feed given its URL.
///
/// The scanner only talks to this trait, which keeps network access out of
/// scanning tests.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

/// [`FeedSource`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    /// Build a client carrying the configured User-Agent and timeout.
    pub fn new(scanning: &ScanningConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

        let client = Client::builder()
            .user_agent(scanning.user_agent.clone())
            .default_headers(headers)
            .timeout(scanning.request_timeout())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}
