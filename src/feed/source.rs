// src/feed/source.rs
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, StatusCode};

pub const DEFAULT_FEED_URL: &str =
    "https://www1.cityoforlando.net/opd/activecalls/activecadpolice.xml";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("Active-Calls-Monitor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timed out fetching feed")]
    Timeout,
    #[error("connection to feed failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(StatusCode),
    #[error("feed request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FetchError {
    /// Transport failures drive exponential backoff; `Other` is treated as unexpected.
    pub fn is_transport(&self) -> bool {
        !matches!(self, FetchError::Other(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e)
        } else if let Some(status) = e.status() {
            FetchError::Status(status)
        } else {
            FetchError::Request(e)
        }
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Raw feed body, exactly as received.
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
    fn name(&self) -> &str;
}

pub struct HttpFeedSource {
    url: String,
    client: Client,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url = %self.url, "fetching feed");
        counter!("feed_fetch_total").increment(1);

        let result = async {
            let resp = self.client.get(&self.url).send().await?.error_for_status()?;
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>(body.to_vec())
        }
        .await;

        match result {
            Ok(body) => {
                tracing::debug!(bytes = body.len(), "fetched feed");
                Ok(body)
            }
            Err(e) => {
                let err = FetchError::from(e);
                tracing::error!(error = %err, url = %self.url, "feed fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
                Err(err)
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
